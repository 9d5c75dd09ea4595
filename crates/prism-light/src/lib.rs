//! # Prism Light
//!
//! Light client orchestration for Prism.
//!
//! `prism-core` proves that one block follows from another; this crate
//! decides *which* blocks to prove things about and *who* to believe. It
//! drives sequential verification against a primary provider, corroborates
//! every result with a pool of independent witnesses, and when two sources
//! disagree about chain history it bisects to the exact common ancestor
//! and constructs attack evidence against whichever side diverged.
//!
//! ## Trust Model
//!
//! - The primary is the main data source; nothing it says is believed
//!   until it verifies against the trust anchor.
//! - Witnesses only corroborate. An unreachable witness is skipped, never
//!   punished; a witness caught serving a conflicting chain is evidenced
//!   and removed from the pool.
//! - Trust state is all-or-nothing per call: a failed or cancelled
//!   verification leaves the trusted block exactly where it was.

pub mod client;
pub mod detector;
pub mod provider;
pub mod store;

mod retry;

// Re-export commonly used items for convenience
pub use client::{Client, ClientError, ClientOptions, DEFAULT_MAX_RETRY_ATTEMPTS};
pub use detector::{compare_with_witness, AttackEvidence, Comparison, DivergenceReport};
pub use provider::{Provider, ProviderError};
pub use store::{MemoryStore, Store, StoreError};
