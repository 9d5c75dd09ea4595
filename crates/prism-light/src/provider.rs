//! The provider capability: anything that can serve light blocks for a
//! chain and accept attack evidence against it.
//!
//! The client core depends only on this contract, never on a concrete
//! backend. The [`mock`] backend lives here as a first-class variant; a
//! networked backend implements the same trait out of tree.

use async_trait::async_trait;
use thiserror::Error;

use prism_core::LightBlock;

use crate::detector::AttackEvidence;

/// Errors a provider round-trip can produce. `Unreachable` is the only
/// transient variant, the one the retry policy acts on.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("light block at height {height} not found")]
    NotFound { height: i64 },

    #[error("provider unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("provider error: {0}")]
    Other(String),
}

/// A data source for signed headers and their validator/voter sets.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier used in logs and evidence reports.
    fn id(&self) -> &str;

    /// Fetch the light block at `height`. A height of zero or below means
    /// "latest known".
    async fn light_block(&self, height: i64) -> Result<LightBlock, ProviderError>;

    /// Hand attack evidence to the node behind this provider so it can
    /// punish the misbehaving validators.
    async fn report_evidence(&self, evidence: AttackEvidence) -> Result<(), ProviderError>;
}

pub mod mock {
    //! Deterministic in-memory provider used by tests and simulations.

    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use prism_core::LightBlock;

    use super::{Provider, ProviderError};
    use crate::detector::AttackEvidence;

    /// In-memory provider over a fixed chain. Records every piece of
    /// evidence submitted to it and can be flipped dead to simulate an
    /// unreachable peer.
    pub struct MockProvider {
        id: String,
        chain: BTreeMap<i64, LightBlock>,
        evidence: Mutex<Vec<AttackEvidence>>,
        dead: AtomicBool,
    }

    impl MockProvider {
        pub fn new(id: impl Into<String>, blocks: impl IntoIterator<Item = LightBlock>) -> Self {
            Self {
                id: id.into(),
                chain: blocks.into_iter().map(|b| (b.height(), b)).collect(),
                evidence: Mutex::new(Vec::new()),
                dead: AtomicBool::new(false),
            }
        }

        /// A provider that never responds.
        pub fn dead_node(id: impl Into<String>) -> Self {
            let provider = Self::new(id, []);
            provider.dead.store(true, Ordering::Relaxed);
            provider
        }

        pub fn set_dead(&self, dead: bool) {
            self.dead.store(dead, Ordering::Relaxed);
        }

        /// Whether the given evidence was submitted to this provider.
        pub fn has_evidence(&self, evidence: &AttackEvidence) -> bool {
            self.evidence.lock().unwrap().iter().any(|e| e == evidence)
        }

        pub fn evidence(&self) -> Vec<AttackEvidence> {
            self.evidence.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn id(&self) -> &str {
            &self.id
        }

        async fn light_block(&self, height: i64) -> Result<LightBlock, ProviderError> {
            if self.dead.load(Ordering::Relaxed) {
                return Err(ProviderError::Unreachable {
                    reason: "mock provider is down".to_string(),
                });
            }
            if height <= 0 {
                return self
                    .chain
                    .values()
                    .next_back()
                    .cloned()
                    .ok_or(ProviderError::NotFound { height });
            }
            self.chain
                .get(&height)
                .cloned()
                .ok_or(ProviderError::NotFound { height })
        }

        async fn report_evidence(&self, evidence: AttackEvidence) -> Result<(), ProviderError> {
            if self.dead.load(Ordering::Relaxed) {
                return Err(ProviderError::Unreachable {
                    reason: "mock provider is down".to_string(),
                });
            }
            self.evidence.lock().unwrap().push(evidence);
            Ok(())
        }
    }
}
