//! Divergence detection and attack evidence construction.
//!
//! After a height has been verified against the primary, every witness is
//! asked for its view of the same height. A hash mismatch means the two
//! chains disagree somewhere at or before that height: a bisection over the
//! verified primary trace finds the exact common ancestor, and two
//! independent, immutable evidence records are built, one against each
//! side, so the node whose view is contradicted can punish the attacker it
//! can prove misbehaved.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use prism_core::{Codec, LightBlock};

use crate::provider::{Provider, ProviderError};
use crate::retry::with_retry;

/// A provable claim that `conflicting_block` contradicts the chain's
/// history as of `common_height`. Constructed once, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackEvidence {
    pub conflicting_block: LightBlock,
    pub common_height: i64,
}

/// Outcome of a single divergence search against one witness.
#[derive(Debug)]
pub struct DivergenceReport {
    pub witness_id: String,
    /// First height at which the two chains visibly disagree.
    pub divergent_height: i64,
    /// Evidence implicating the primary, for submission to the witness.
    /// Absent when the witness became unreachable mid-bisection: plain
    /// disagreement is reported rather than an incomplete evidence record.
    pub evidence_against_primary: Option<AttackEvidence>,
    /// Evidence implicating the witness, for submission to the primary.
    pub evidence_against_witness: Option<AttackEvidence>,
}

/// What a witness comparison concluded.
#[derive(Debug)]
pub enum Comparison {
    /// The witness agrees with the primary at the target height.
    Agreement,
    /// The witness could not be reached within the retry budget.
    /// Unreachable is not faulty: the witness stays in the pool.
    Unreachable,
    /// The witness and the primary disagree about chain history.
    Divergence(DivergenceReport),
}

/// Compare the verified primary trace against one witness.
///
/// `trace` is the sequence of blocks verified against the primary for the
/// current call: `trace[0]` is the previously trusted checkpoint and the
/// last entry is the candidate at the target height.
pub async fn compare_with_witness(
    codec: &Codec,
    trace: &[LightBlock],
    witness: &dyn Provider,
    max_retry_attempts: u32,
) -> Comparison {
    let Some(target) = trace.last() else {
        return Comparison::Agreement;
    };
    let target_height = target.height();

    let witness_block = match fetch(witness, target_height, max_retry_attempts).await {
        Ok(block) => block,
        Err(err) => {
            debug!(witness = witness.id(), height = target_height, %err, "witness unavailable");
            return Comparison::Unreachable;
        }
    };

    let primary_hash = codec.hash_header(&target.signed_header.header);
    let witness_hash = codec.hash_header(&witness_block.signed_header.header);
    if primary_hash == witness_hash {
        return Comparison::Agreement;
    }

    warn!(
        witness = witness.id(),
        height = target_height,
        primary_hash = %hex::encode(primary_hash),
        witness_hash = %hex::encode(witness_hash),
        "header mismatch, bisecting for common ancestor"
    );

    bisect(codec, trace, witness, witness_block, max_retry_attempts).await
}

/// Narrow the disagreement to the largest trace index whose header both
/// sides agree on. O(log n) witness round-trips over the verified trace.
async fn bisect(
    codec: &Codec,
    trace: &[LightBlock],
    witness: &dyn Provider,
    witness_at_target: LightBlock,
    max_retry_attempts: u32,
) -> Comparison {
    let witness_id = witness.id().to_string();

    let plain_disagreement = |divergent_height| {
        Comparison::Divergence(DivergenceReport {
            witness_id: witness_id.clone(),
            divergent_height,
            evidence_against_primary: None,
            evidence_against_witness: None,
        })
    };

    // The checkpoint itself must match, otherwise the divergence predates
    // the trace and no common height can be established from it.
    let checkpoint_height = trace[0].height();
    if trace.len() < 2 {
        return plain_disagreement(checkpoint_height);
    }
    match fetch(witness, checkpoint_height, max_retry_attempts).await {
        Ok(block) => {
            if codec.hash_header(&block.signed_header.header)
                != codec.hash_header(&trace[0].signed_header.header)
            {
                warn!(
                    witness = %witness_id,
                    height = checkpoint_height,
                    "witness disagrees below the verified checkpoint"
                );
                return plain_disagreement(checkpoint_height);
            }
        }
        Err(_) => return plain_disagreement(checkpoint_height),
    }

    // Invariant: trace[lo] matches the witness, trace[hi] does not.
    let mut lo = 0;
    let mut hi = trace.len() - 1;
    let mut witness_at_hi = witness_at_target;

    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        let mid_height = trace[mid].height();
        let witness_mid = match fetch(witness, mid_height, max_retry_attempts).await {
            Ok(block) => block,
            Err(err) => {
                warn!(witness = %witness_id, height = mid_height, %err,
                    "witness lost mid-bisection, reporting plain disagreement");
                return plain_disagreement(trace[hi].height());
            }
        };
        if codec.hash_header(&witness_mid.signed_header.header)
            == codec.hash_header(&trace[mid].signed_header.header)
        {
            lo = mid;
        } else {
            hi = mid;
            witness_at_hi = witness_mid;
        }
        debug!(witness = %witness_id, lo = trace[lo].height(), hi = trace[hi].height(), "bisection step");
    }

    let divergent_height = trace[hi].height();

    // Attack shape decides the common height. Equivocation: both sides
    // agree on who was authorized at the divergent height, so the
    // contradiction is provable right there. Lunatic: the validator set
    // itself was forged, so the last unforged height is the anchor.
    let primary_vals = codec.hash_validator_set(&trace[hi].validator_set);
    let witness_vals = codec.hash_validator_set(&witness_at_hi.validator_set);
    let common_height = if primary_vals == witness_vals {
        divergent_height
    } else {
        trace[lo].height()
    };

    Comparison::Divergence(DivergenceReport {
        witness_id,
        divergent_height,
        evidence_against_primary: Some(AttackEvidence {
            conflicting_block: trace[hi].clone(),
            common_height,
        }),
        evidence_against_witness: Some(AttackEvidence {
            conflicting_block: witness_at_hi,
            common_height,
        }),
    })
}

async fn fetch(
    provider: &dyn Provider,
    height: i64,
    max_retry_attempts: u32,
) -> Result<LightBlock, ProviderError> {
    with_retry(max_retry_attempts, || provider.light_block(height)).await
}
