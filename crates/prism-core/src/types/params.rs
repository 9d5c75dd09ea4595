use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::VerificationError;
use crate::types::block::Hash;

/// Parameters controlling voter sampling, fixed for a chain at genesis and
/// validated once at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterParams {
    /// Minimum number of validators below which sampling is skipped and the
    /// whole validator set votes. Sampling has no benefit below this size.
    pub voter_election_threshold: i32,
    /// Upper bound on the Byzantine share of the full validator set, in
    /// percent. Must be between 1 and 33.
    pub max_tolerable_byzantine_percentage: i32,
    /// Precision digit count of the committee safety bound: a value of 5
    /// means the sampled committee preserves the honest majority with
    /// probability at least 0.99999. Must be between 2 and 15.
    pub election_precision: i32,
}

impl Default for VoterParams {
    fn default() -> Self {
        Self {
            voter_election_threshold: 0,
            max_tolerable_byzantine_percentage: 20,
            election_precision: 5,
        }
    }
}

impl VoterParams {
    /// Check the documented parameter ranges. Values outside them are
    /// rejected at construction and never reach the sampler.
    pub fn validate(&self) -> Result<(), VerificationError> {
        if self.voter_election_threshold < 0 {
            return Err(VerificationError::InvalidParams {
                reason: format!(
                    "voter_election_threshold must be greater than or equal to 0, got {}",
                    self.voter_election_threshold
                ),
            });
        }
        if self.max_tolerable_byzantine_percentage <= 0
            || self.max_tolerable_byzantine_percentage >= 34
        {
            return Err(VerificationError::InvalidParams {
                reason: format!(
                    "max_tolerable_byzantine_percentage must be between 1 and 33, got {}",
                    self.max_tolerable_byzantine_percentage
                ),
            });
        }
        if self.election_precision <= 1 || self.election_precision > 15 {
            return Err(VerificationError::InvalidParams {
                reason: format!(
                    "election_precision must be between 2 and 15, got {}",
                    self.election_precision
                ),
            });
        }
        Ok(())
    }
}

/// The root of trust for a light client: a height and the header hash the
/// operator obtained out of band, plus how long a trusted header stays
/// usable. Once a client is constructed the trusted height only moves
/// forward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustOptions {
    /// How long a trusted header can anchor verification before the client
    /// must be re-anchored.
    pub period: Duration,
    /// Height of the trust anchor.
    pub height: i64,
    /// Header hash at the trust anchor height.
    pub hash: Hash,
}

impl TrustOptions {
    pub fn validate(&self) -> Result<(), VerificationError> {
        if self.period.is_zero() {
            return Err(VerificationError::InvalidParams {
                reason: "trusting period must be greater than zero".to_string(),
            });
        }
        if self.height <= 0 {
            return Err(VerificationError::InvalidParams {
                reason: format!("trusted height must be positive, got {}", self.height),
            });
        }
        Ok(())
    }
}

/// Fraction of trusted voting power that must have signed a candidate
/// header for skip-mode verification to accept it directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustThreshold {
    pub numerator: u64,
    pub denominator: u64,
}

impl Default for TrustThreshold {
    /// The conventional 1/3 trust level.
    fn default() -> Self {
        Self {
            numerator: 1,
            denominator: 3,
        }
    }
}

impl TrustThreshold {
    pub fn validate(&self) -> Result<(), VerificationError> {
        if self.denominator == 0
            || self.numerator * 3 < self.denominator
            || self.numerator > self.denominator
        {
            return Err(VerificationError::InvalidParams {
                reason: format!(
                    "trust threshold must be within [1/3, 1], got {}/{}",
                    self.numerator, self.denominator
                ),
            });
        }
        Ok(())
    }

    /// Whether `signed` out of `total` power meets the threshold.
    pub fn is_met(&self, signed: i64, total: i64) -> bool {
        signed as i128 * self.denominator as i128 > total as i128 * self.numerator as i128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        assert!(VoterParams::default().validate().is_ok());
    }

    #[test]
    fn test_byzantine_percentage_bounds() {
        let mut params = VoterParams::default();

        params.max_tolerable_byzantine_percentage = 0;
        assert!(params.validate().is_err());
        params.max_tolerable_byzantine_percentage = 34;
        assert!(params.validate().is_err());

        params.max_tolerable_byzantine_percentage = 1;
        assert!(params.validate().is_ok());
        params.max_tolerable_byzantine_percentage = 33;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_election_precision_bounds() {
        let mut params = VoterParams::default();

        params.election_precision = 1;
        assert!(params.validate().is_err());
        params.election_precision = 16;
        assert!(params.validate().is_err());

        params.election_precision = 2;
        assert!(params.validate().is_ok());
        params.election_precision = 15;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_negative_election_threshold_rejected() {
        let params = VoterParams {
            voter_election_threshold: -1,
            ..VoterParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_trust_options_validation() {
        let good = TrustOptions {
            period: Duration::from_secs(3600),
            height: 1,
            hash: [0xAA; 32],
        };
        assert!(good.validate().is_ok());

        let zero_period = TrustOptions {
            period: Duration::ZERO,
            ..good.clone()
        };
        assert!(zero_period.validate().is_err());

        let bad_height = TrustOptions { height: 0, ..good };
        assert!(bad_height.validate().is_err());
    }

    #[test]
    fn test_trust_threshold() {
        let third = TrustThreshold::default();
        assert!(third.validate().is_ok());
        assert!(third.is_met(34, 100));
        assert!(!third.is_met(33, 100));

        let too_low = TrustThreshold {
            numerator: 1,
            denominator: 4,
        };
        assert!(too_low.validate().is_err());

        let over_one = TrustThreshold {
            numerator: 4,
            denominator: 3,
        };
        assert!(over_one.validate().is_err());
    }
}
