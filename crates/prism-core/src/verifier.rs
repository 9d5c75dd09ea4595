//! Trust-chain verification.
//!
//! Given a block the client already trusts and a candidate block supplied
//! by a provider, prove that the candidate was produced by a committee with
//! legitimate, continuously derivable authority. Sequential verification
//! walks the chain one height at a time, checking validator-set succession
//! and voter signature thresholds at every step. The skip-mode primitive
//! ([`verify_non_adjacent`]) is provided for forward compatibility, but the
//! voter sampling design only supports the sequential path, so no bisection
//! scheduler is built on top of it.

use std::time::Duration;

use blst::min_pk::{PublicKey, Signature};
use blst::BLST_ERROR;

use crate::codec::Codec;
use crate::error::VerificationError;
use crate::types::block::{LightBlock, SignedHeader, VoterSet, BLS_DST};
use crate::types::params::{TrustThreshold, VoterParams};
use crate::voter::select_voters;

/// Check that a trusted header is still usable as an anchor at `now`.
pub fn ensure_within_trust_period(
    trusted: &LightBlock,
    trusting_period: Duration,
    now: u64,
) -> Result<(), VerificationError> {
    let age = now.saturating_sub(trusted.time());
    if age >= trusting_period.as_secs() {
        return Err(VerificationError::ExpiredTrust {
            trusted_time: trusted.time(),
            now,
            period_secs: trusting_period.as_secs(),
        });
    }
    Ok(())
}

/// Check a light block's internal consistency: the header commits to
/// exactly the validator and voter sets it carries, the voter set is the
/// deterministic sample of the validator set, and the commit binds to the
/// header.
pub fn validate_light_block(
    codec: &Codec,
    block: &LightBlock,
    params: &VoterParams,
) -> Result<(), VerificationError> {
    let header = &block.signed_header.header;

    if header.height <= 0 {
        return Err(VerificationError::InvalidHeader {
            reason: format!("non-positive height {}", header.height),
        });
    }

    if codec.hash_validator_set(&block.validator_set) != header.validators_hash {
        return Err(VerificationError::InvalidHeader {
            reason: "validator set does not match validators_hash".to_string(),
        });
    }

    if codec.hash_voter_set(&block.voter_set) != header.voters_hash {
        return Err(VerificationError::InvalidHeader {
            reason: "voter set does not match voters_hash".to_string(),
        });
    }

    // The voter set is never authoritative on its own: recomputing the
    // sample from the validator set and the header's proof hash must
    // reproduce it exactly.
    let derived = select_voters(&block.validator_set, &header.proof_hash, params)?;
    if derived != block.voter_set {
        return Err(VerificationError::InvalidHeader {
            reason: "voter set is not the deterministic sample of the validator set".to_string(),
        });
    }

    if !codec.commit_binds_header(&block.signed_header.commit, header) {
        return Err(VerificationError::InvalidHeader {
            reason: "commit does not bind to header".to_string(),
        });
    }

    Ok(())
}

/// Verify that a commit carries signatures from voter set members whose
/// combined assigned power exceeds 2/3 of the set's total.
pub fn verify_commit(
    codec: &Codec,
    voters: &VoterSet,
    signed_header: &SignedHeader,
) -> Result<(), VerificationError> {
    let header = &signed_header.header;
    let commit = &signed_header.commit;
    let sign_bytes = codec.vote_sign_bytes(&header.chain_id, commit.height, &commit.block_hash);

    let mut tallied = 0i64;
    let mut seen: Vec<[u8; 20]> = Vec::with_capacity(commit.signatures.len());

    for sig in &commit.signatures {
        // Signatures from addresses outside the voter set carry no weight,
        // and a voter is only ever counted once.
        let Some(voter) = voters.voter_by_address(&sig.voter_address) else {
            continue;
        };
        if seen.contains(&sig.voter_address) {
            continue;
        }

        verify_bls_signature(&voter.validator.pub_key.0, &sign_bytes, &sig.signature.0).map_err(
            |_| VerificationError::InvalidSignature {
                address: hex::encode(sig.voter_address),
            },
        )?;

        seen.push(sig.voter_address);
        tallied += voter.voting_power;
    }

    let total = voters.total_voting_power();
    if tallied as i128 * 3 <= total as i128 * 2 {
        return Err(VerificationError::InsufficientVotingPower {
            signed: tallied,
            total,
        });
    }

    Ok(())
}

/// Sequential verification step: prove that `untrusted` at height
/// `trusted.height + 1` is the legitimate successor of `trusted`.
pub fn verify_single(
    codec: &Codec,
    trusted: &LightBlock,
    untrusted: &LightBlock,
    params: &VoterParams,
    trusting_period: Duration,
    now: u64,
) -> Result<(), VerificationError> {
    ensure_within_trust_period(trusted, trusting_period, now)?;

    let trusted_header = &trusted.signed_header.header;
    let header = &untrusted.signed_header.header;

    if header.height != trusted_header.height + 1 {
        return Err(VerificationError::InvalidHeader {
            reason: format!(
                "expected height {}, got {}",
                trusted_header.height + 1,
                header.height
            ),
        });
    }

    if header.chain_id != trusted_header.chain_id {
        return Err(VerificationError::InvalidHeader {
            reason: format!(
                "chain id mismatch: trusted {}, candidate {}",
                trusted_header.chain_id, header.chain_id
            ),
        });
    }

    if header.time <= trusted_header.time {
        return Err(VerificationError::InvalidHeader {
            reason: format!(
                "block time {} is not after trusted time {}",
                header.time, trusted_header.time
            ),
        });
    }

    if header.last_block_hash != codec.hash_header(trusted_header) {
        return Err(VerificationError::InvalidHeader {
            reason: "last_block_hash does not match trusted header".to_string(),
        });
    }

    // Validator-set succession: the trusted header already committed to
    // who may validate the next height.
    if trusted_header.next_validators_hash != header.validators_hash {
        return Err(VerificationError::InvalidHeader {
            reason: "validator set does not match trusted next_validators_hash".to_string(),
        });
    }

    validate_light_block(codec, untrusted, params)?;
    verify_commit(codec, &untrusted.voter_set, &untrusted.signed_header)
}

/// Skip-mode verification contract: accept `untrusted` at any future height
/// directly if voters the client already trusts account for more than
/// `trust_level` of the trusted voter power among the candidate's signers.
///
/// Pure primitive only; see the module docs.
pub fn verify_non_adjacent(
    codec: &Codec,
    trusted: &LightBlock,
    untrusted: &LightBlock,
    params: &VoterParams,
    trust_level: TrustThreshold,
    trusting_period: Duration,
    now: u64,
) -> Result<(), VerificationError> {
    ensure_within_trust_period(trusted, trusting_period, now)?;
    trust_level.validate()?;

    let trusted_header = &trusted.signed_header.header;
    let header = &untrusted.signed_header.header;

    if header.height <= trusted_header.height {
        return Err(VerificationError::InvalidHeader {
            reason: format!(
                "candidate height {} is not after trusted height {}",
                header.height, trusted_header.height
            ),
        });
    }

    if header.chain_id != trusted_header.chain_id {
        return Err(VerificationError::InvalidHeader {
            reason: "chain id mismatch".to_string(),
        });
    }

    validate_light_block(codec, untrusted, params)?;
    verify_commit(codec, &untrusted.voter_set, &untrusted.signed_header)?;

    // Overlap check: enough of the power the client already trusts must
    // have signed the candidate.
    let commit = &untrusted.signed_header.commit;
    let sign_bytes = codec.vote_sign_bytes(&header.chain_id, commit.height, &commit.block_hash);

    let mut overlap = 0i64;
    let mut seen: Vec<[u8; 20]> = Vec::new();
    for sig in &commit.signatures {
        let Some(voter) = trusted.voter_set.voter_by_address(&sig.voter_address) else {
            continue;
        };
        if seen.contains(&sig.voter_address) {
            continue;
        }
        if verify_bls_signature(&voter.validator.pub_key.0, &sign_bytes, &sig.signature.0).is_ok() {
            seen.push(sig.voter_address);
            overlap += voter.voting_power;
        }
    }

    let total = trusted.voter_set.total_voting_power();
    if !trust_level.is_met(overlap, total) {
        return Err(VerificationError::InsufficientTrustedOverlap {
            signed: overlap,
            total,
        });
    }

    Ok(())
}

/// Verify a single BLS12-381 signature.
fn verify_bls_signature(pubkey: &[u8; 48], message: &[u8], signature: &[u8; 96]) -> Result<(), ()> {
    let sig = Signature::from_bytes(signature).map_err(|_| ())?;
    let pk = PublicKey::from_bytes(pubkey).map_err(|_| ())?;
    let result = sig.verify(true, message, BLS_DST, &[], &pk, true);
    if result != BLST_ERROR::BLST_SUCCESS {
        return Err(());
    }
    Ok(())
}
