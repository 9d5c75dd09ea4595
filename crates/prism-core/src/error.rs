use thiserror::Error;

/// Errors produced by voter sampling and trust-chain verification.
/// Each variant is a specific, actionable failure, never a generic
/// "invalid" error. Any ambiguity fails closed with one of these.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("validator set is empty")]
    EmptyValidatorSet,

    #[error(
        "trusted header from {trusted_time} has expired at {now} (trusting period {period_secs}s)"
    )]
    ExpiredTrust {
        trusted_time: u64,
        now: u64,
        period_secs: u64,
    },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid commit signature from voter {address}")]
    InvalidSignature { address: String },

    #[error(
        "insufficient voting power: {signed} of {total} assigned power signed (need more than 2/3)"
    )]
    InsufficientVotingPower { signed: i64, total: i64 },

    #[error(
        "insufficient trusted voter overlap: {signed} of {total} trusted power signed the candidate"
    )]
    InsufficientTrustedOverlap { signed: i64, total: i64 },
}
