//! The light client orchestrator.
//!
//! Owns the trust state: a single latest trusted block that only ever
//! moves forward, a primary provider driving verification, and a pool of
//! witnesses corroborating the primary's view. Verification calls are
//! serialized (one call advances trust state at a time) and commit
//! all-or-nothing: a failed or abandoned call leaves the trusted block
//! untouched.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use prism_core::{
    validate_light_block, verify_commit, verify_single, Codec, LightBlock, TrustOptions,
    VerificationError, VoterParams,
};

use crate::detector::{compare_with_witness, AttackEvidence, Comparison, DivergenceReport};
use crate::provider::{Provider, ProviderError};
use crate::retry::with_retry;
use crate::store::{Store, StoreError};

/// Default provider round-trip budget per call.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("witness {witness} at height {height} does not match primary")]
    PrimaryMismatch {
        witness: String,
        height: i64,
        /// Evidence implicating the primary, when bisection could complete.
        evidence: Option<AttackEvidence>,
    },

    #[error("no witness could be reached to corroborate the primary")]
    NoAvailableProvider,

    #[error("light client has no witnesses configured")]
    NoWitnesses,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("height {height} is below the trusted height {trusted} and no longer stored")]
    HeightTooOld { height: i64, trusted: i64 },
}

/// Tunables passed in at construction, never read from process state.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Retries per provider round-trip before the provider is treated as
    /// unreachable for the current call.
    pub max_retry_attempts: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
        }
    }
}

/// A light client anchored at a trusted (height, hash) pair.
///
/// The voter sampling design supports sequential verification only: each
/// height is validated against its predecessor, so trust is continuously
/// derivable from the anchor without ever re-executing the chain.
pub struct Client {
    chain_id: String,
    codec: Codec,
    voter_params: VoterParams,
    trusting_period: Duration,
    options: ClientOptions,
    primary: Arc<dyn Provider>,
    witnesses: RwLock<Vec<Arc<dyn Provider>>>,
    trusted: RwLock<LightBlock>,
    store: Arc<dyn Store>,
    // Serializes trust-state advancement: only one verification call may
    // be in flight per client.
    verification_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("chain_id", &self.chain_id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Construct a client from a trust anchor.
    ///
    /// Fetches the anchor block from the primary, checks it against the
    /// anchor hash and its own commit, and cross-checks the anchor header
    /// against every witness. Any witness disagreement fails construction
    /// with [`ClientError::PrimaryMismatch`] before trust is established;
    /// unreachable witnesses are tolerated.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        chain_id: impl Into<String>,
        codec: Codec,
        trust_options: TrustOptions,
        primary: Arc<dyn Provider>,
        witnesses: Vec<Arc<dyn Provider>>,
        store: Arc<dyn Store>,
        voter_params: VoterParams,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let chain_id = chain_id.into();
        trust_options.validate()?;
        voter_params.validate()?;
        if witnesses.is_empty() {
            return Err(ClientError::NoWitnesses);
        }

        let anchor = with_retry(options.max_retry_attempts, || {
            primary.light_block(trust_options.height)
        })
        .await?;

        if anchor.chain_id() != chain_id {
            return Err(VerificationError::InvalidHeader {
                reason: format!(
                    "anchor belongs to chain {}, expected {}",
                    anchor.chain_id(),
                    chain_id
                ),
            }
            .into());
        }

        let anchor_hash = codec.hash_header(&anchor.signed_header.header);
        if anchor_hash != trust_options.hash {
            return Err(VerificationError::InvalidHeader {
                reason: format!(
                    "anchor hash {} does not match trust options hash {}",
                    hex::encode(anchor_hash),
                    hex::encode(trust_options.hash)
                ),
            }
            .into());
        }

        validate_light_block(&codec, &anchor, &voter_params)?;
        verify_commit(&codec, &anchor.voter_set, &anchor.signed_header)?;

        // Cross-check the anchor against every witness before any forward
        // progress is made.
        let checks = futures::future::join_all(witnesses.iter().map(|witness| {
            let anchor_height = trust_options.height;
            async move {
                let fetched = with_retry(options.max_retry_attempts, || {
                    witness.light_block(anchor_height)
                })
                .await;
                (witness.id().to_string(), fetched)
            }
        }))
        .await;

        for (witness_id, fetched) in checks {
            match fetched {
                Ok(block) => {
                    if codec.hash_header(&block.signed_header.header) != anchor_hash {
                        return Err(ClientError::PrimaryMismatch {
                            witness: witness_id,
                            height: trust_options.height,
                            evidence: None,
                        });
                    }
                }
                Err(err) => {
                    warn!(witness = %witness_id, %err, "witness unavailable for anchor cross-check");
                }
            }
        }

        store.save_light_block(&anchor)?;
        info!(
            chain_id = %chain_id,
            height = anchor.height(),
            hash = %hex::encode(anchor_hash),
            witnesses = witnesses.len(),
            "light client anchored"
        );

        Ok(Self {
            chain_id,
            codec,
            voter_params,
            trusting_period: trust_options.period,
            options,
            primary,
            witnesses: RwLock::new(witnesses),
            trusted: RwLock::new(anchor),
            store,
            verification_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// The latest block the client trusts.
    pub fn latest_trusted(&self) -> LightBlock {
        self.trusted.read().unwrap().clone()
    }

    /// A consistent snapshot of the live witness pool. The pool shrinks
    /// when a witness is proven faulty and is otherwise stable.
    pub fn witnesses(&self) -> Vec<Arc<dyn Provider>> {
        self.witnesses.read().unwrap().clone()
    }

    /// Verify the header at `height` (zero or below: the primary's latest)
    /// and advance trust to it.
    ///
    /// Walks the primary sequentially from the trusted height, then fans
    /// the result out to every witness. The trusted block advances only
    /// after all witness comparisons resolve without evidence of an
    /// attack; on any failure the trust state is unchanged.
    pub async fn verify_light_block_at_height(
        &self,
        height: i64,
        now: u64,
    ) -> Result<LightBlock, ClientError> {
        let _guard = self.verification_lock.lock().await;

        let trusted = self.latest_trusted();

        let target_height = if height <= 0 {
            let latest = with_retry(self.options.max_retry_attempts, || {
                self.primary.light_block(0)
            })
            .await?;
            latest.height()
        } else {
            height
        };

        // Re-verifying history is idempotent: already-trusted heights are
        // answered from trust state or the store without touching the
        // witness pool.
        if target_height == trusted.height() {
            return Ok(trusted);
        }
        if target_height < trusted.height() {
            return self
                .store
                .light_block(target_height)
                .map_err(|_| ClientError::HeightTooOld {
                    height: target_height,
                    trusted: trusted.height(),
                });
        }

        prism_core::ensure_within_trust_period(&trusted, self.trusting_period, now)?;

        // Sequential walk against the primary. Nothing is persisted or
        // trusted until the whole call succeeds.
        let mut trace = vec![trusted];
        for next_height in trace[0].height() + 1..=target_height {
            let candidate = with_retry(self.options.max_retry_attempts, || {
                self.primary.light_block(next_height)
            })
            .await?;
            verify_single(
                &self.codec,
                trace.last().unwrap(),
                &candidate,
                &self.voter_params,
                self.trusting_period,
                now,
            )?;
            debug!(height = next_height, "verified against primary");
            trace.push(candidate);
        }

        // Fan out to the witness pool. Comparisons run concurrently and
        // may finish in any order; trust only advances once all of them
        // have resolved.
        let pool = self.witnesses();
        if pool.is_empty() {
            return Err(ClientError::NoWitnesses);
        }

        let trace_ref = &trace;
        let comparisons = futures::future::join_all(pool.iter().map(|witness| async move {
            compare_with_witness(
                &self.codec,
                trace_ref,
                witness.as_ref(),
                self.options.max_retry_attempts,
            )
            .await
        }))
        .await;

        let mut agreeing = 0usize;
        let mut faulty: Vec<(Arc<dyn Provider>, DivergenceReport)> = Vec::new();
        for (witness, comparison) in pool.iter().zip(comparisons) {
            match comparison {
                Comparison::Agreement => agreeing += 1,
                Comparison::Unreachable => {
                    debug!(witness = witness.id(), "witness skipped: unreachable");
                }
                Comparison::Divergence(report) => faulty.push((witness.clone(), report)),
            }
        }

        if !faulty.is_empty() {
            return Err(self.handle_divergence(faulty).await);
        }

        if agreeing == 0 {
            return Err(ClientError::NoAvailableProvider);
        }

        // All witnesses agree or were skipped: commit.
        for block in &trace[1..] {
            self.store.save_light_block(block)?;
        }
        let verified = trace.pop().expect("trace contains the target block");
        *self.trusted.write().unwrap() = verified.clone();
        info!(height = verified.height(), "trusted height advanced");
        Ok(verified)
    }

    /// Submit evidence both ways, prune the implicated witnesses, and
    /// build the mismatch error surfaced to the caller.
    async fn handle_divergence(
        &self,
        faulty: Vec<(Arc<dyn Provider>, DivergenceReport)>,
    ) -> ClientError {
        for (witness, report) in &faulty {
            warn!(
                witness = %report.witness_id,
                divergent_height = report.divergent_height,
                "divergence confirmed, removing witness and submitting evidence"
            );
            if let (Some(against_primary), Some(against_witness)) = (
                &report.evidence_against_primary,
                &report.evidence_against_witness,
            ) {
                if let Err(err) = witness.report_evidence(against_primary.clone()).await {
                    warn!(witness = %report.witness_id, %err, "failed to submit evidence to witness");
                }
                if let Err(err) = self.primary.report_evidence(against_witness.clone()).await {
                    warn!(primary = self.primary.id(), %err, "failed to submit evidence to primary");
                }
            }
        }

        {
            let mut pool = self.witnesses.write().unwrap();
            pool.retain(|candidate| {
                !faulty
                    .iter()
                    .any(|(removed, _)| Arc::ptr_eq(candidate, removed))
            });
        }

        let (_, report) = faulty
            .into_iter()
            .next()
            .expect("handle_divergence called with at least one report");
        ClientError::PrimaryMismatch {
            witness: report.witness_id,
            height: report.divergent_height,
            evidence: report.evidence_against_primary,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }
}
