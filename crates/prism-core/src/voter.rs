//! Deterministic voter sampling.
//!
//! Every height, a subset of the full validator set is elected to sign the
//! block, seeded by the header's per-height VRF output. The draw is a pure
//! function of `(validator set, seed, params)` so that independent
//! verifiers converge on the same committee without negotiation: the light
//! client recomputes the committee and rejects any block whose claimed
//! voter set differs.
//!
//! The committee size is chosen so that, as long as the Byzantine share of
//! the full set stays below `max_tolerable_byzantine_percentage`, the
//! probability of the sample containing a Byzantine-power majority is below
//! `10^-election_precision` (Hoeffding tail bound on the sampled Byzantine
//! fraction).

use crate::codec::sha256;
use crate::error::VerificationError;
use crate::types::block::{Hash, Validator, ValidatorSet, Voter, VoterSet};
use crate::types::params::VoterParams;

/// ln(10) scaled by 10^6, for integer-only evaluation of the size bound.
const LN10_E6: u128 = 2_302_585;

/// Sample the voter set for one height.
///
/// Identical inputs always produce a byte-identical voter set and power
/// assignment. Fails with `InvalidParams` on out-of-range params and
/// `EmptyValidatorSet` when there is nothing to sample from.
pub fn select_voters(
    validators: &ValidatorSet,
    seed: &Hash,
    params: &VoterParams,
) -> Result<VoterSet, VerificationError> {
    params.validate()?;

    if validators.is_empty() || validators.total_voting_power() <= 0 {
        return Err(VerificationError::EmptyValidatorSet);
    }

    // Below the election threshold sampling buys nothing: the whole set
    // votes with its original powers.
    if validators.len() <= params.voter_election_threshold as usize {
        let voters = canonical_order(validators.validators.clone())
            .into_iter()
            .map(|v| Voter {
                voting_power: v.voting_power,
                validator: v,
            })
            .collect();
        return Ok(VoterSet::new(voters));
    }

    let target = committee_size(params).min(validators.len());

    // Power-proportional draw without replacement, hash-chained from the
    // seed. Each round consumes the current digest to pick a winner, then
    // folds the round index back into the state.
    let mut pool = canonical_order(validators.validators.clone());
    let mut remaining_power = validators.total_voting_power();
    let mut state = sha256(seed);
    let mut winners = Vec::with_capacity(target);

    for round in 0..target {
        let draw = u64::from_be_bytes(state[..8].try_into().unwrap());
        let mut point = (draw % remaining_power as u64) as i64;

        let mut idx = pool.len() - 1;
        for (i, v) in pool.iter().enumerate() {
            if point < v.voting_power {
                idx = i;
                break;
            }
            point -= v.voting_power;
        }

        let winner = pool.remove(idx);
        remaining_power -= winner.voting_power;
        winners.push(Voter {
            voting_power: winner.voting_power,
            validator: winner,
        });

        if remaining_power <= 0 {
            break;
        }

        let mut next = Vec::with_capacity(40);
        next.extend_from_slice(&state);
        next.extend_from_slice(&(round as u64).to_be_bytes());
        state = sha256(&next);
    }

    winners.sort_by(|a, b| {
        b.validator
            .voting_power
            .cmp(&a.validator.voting_power)
            .then_with(|| a.validator.address.cmp(&b.validator.address))
    });

    Ok(VoterSet::new(winners))
}

/// Smallest committee size `k` with `exp(-2k(1/2 - b)^2) < 10^-p`, where
/// `b` is the tolerable Byzantine fraction and `p` the election precision.
/// Evaluated over integers so every platform derives the same `k`.
fn committee_size(params: &VoterParams) -> usize {
    let b = params.max_tolerable_byzantine_percentage as u128;
    let p = params.election_precision as u128;

    // k > p * ln(10) / (2 * ((50 - b) / 100)^2), all scaled to integers.
    let numer = p * LN10_E6 * 10_000;
    let denom = 2 * (50 - b) * (50 - b) * 1_000_000;
    let k = (numer + denom - 1) / denom;
    k.max(1) as usize
}

/// Canonical validator ordering: voting power descending, address ascending
/// as tie break. Sampling and final voter sets both use this order.
fn canonical_order(mut validators: Vec<Validator>) -> Vec<Validator> {
    validators.sort_by(|a, b| {
        b.voting_power
            .cmp(&a.voting_power)
            .then_with(|| a.address.cmp(&b.address))
    });
    validators
}
