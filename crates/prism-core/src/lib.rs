//! # Prism Core
//!
//! Pure Rust light client verification logic.
//!
//! This crate contains **no networking code** and **no async runtime**.
//! It is the cryptographic heart of Prism: every header the light client
//! trusts passes through these verification functions first.
//!
//! ## Trust Model
//!
//! - **Voter sampling** (`voter` module): every height, a committee is
//!   deterministically sampled from the full validator set, seeded by the
//!   header's VRF output. The committee size is chosen so the sample keeps
//!   the honest-majority property of the full set with a configurable
//!   probability bound.
//!
//! - **Trust-chain verification** (`verifier` module): starting from a
//!   trusted block, each successor is accepted only if validator-set
//!   succession holds and more than 2/3 of the sampled voter power signed
//!   it. Trusts that the Byzantine share of the full validator set stays
//!   below the configured bound (same assumption as the chain itself).
//!
//! ## Usage
//!
//! ```ignore
//! use prism_core::{Codec, select_voters, verify_single};
//! ```

pub mod codec;
pub mod error;
pub mod types;
pub mod verifier;
pub mod voter;

// Re-export commonly used items for convenience
pub use codec::Codec;
pub use error::VerificationError;
pub use types::block::{
    Address, BlsPublicKey, BlsSignature, Commit, CommitSig, Hash, Header, LightBlock,
    SignedHeader, Validator, ValidatorSet, Voter, VoterSet, BLS_DST,
};
pub use types::params::{TrustOptions, TrustThreshold, VoterParams};
pub use verifier::{
    ensure_within_trust_period, validate_light_block, verify_commit, verify_non_adjacent,
    verify_single,
};
pub use voter::select_voters;
