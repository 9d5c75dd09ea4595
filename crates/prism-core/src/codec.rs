//! Canonical byte encoding and hashing for headers, validator sets and
//! votes.
//!
//! Every component that needs canonical bytes receives an explicit [`Codec`]
//! value constructed once per process; there is no ambient serialization
//! registry. Two independent verifiers holding equal codecs produce
//! identical hashes for identical values, which is what lets them agree on
//! chain history without negotiation.

use sha2::{Digest, Sha256};

use crate::types::block::{Commit, Hash, Header, ValidatorSet, VoterSet};

// Domain tags keep hashes of different object kinds from colliding.
const TAG_HEADER: u8 = 0x01;
const TAG_VALIDATOR_SET: u8 = 0x02;
const TAG_VOTER_SET: u8 = 0x03;
const TAG_VOTE: u8 = 0x04;

/// Canonical encoder for everything the light client hashes or signs.
#[derive(Clone, Debug, Default)]
pub struct Codec {
    _private: (),
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash of a header. This is the block hash that commits, trust anchors
    /// and divergence comparisons all refer to.
    pub fn hash_header(&self, header: &Header) -> Hash {
        let mut buf = Vec::with_capacity(512);
        buf.push(TAG_HEADER);
        put_bytes(&mut buf, header.chain_id.as_bytes());
        put_i64(&mut buf, header.height);
        put_u64(&mut buf, header.time);
        put_bytes(&mut buf, &header.last_block_hash);
        put_bytes(&mut buf, &header.validators_hash);
        put_bytes(&mut buf, &header.next_validators_hash);
        put_bytes(&mut buf, &header.voters_hash);
        put_bytes(&mut buf, &header.proof_hash);
        put_bytes(&mut buf, &header.app_hash);
        put_bytes(&mut buf, &header.consensus_hash);
        put_bytes(&mut buf, &header.results_hash);
        put_bytes(&mut buf, &header.proposer_address);
        sha256(&buf)
    }

    /// Hash of a full validator set, as committed by `validators_hash`.
    pub fn hash_validator_set(&self, set: &ValidatorSet) -> Hash {
        let mut buf = Vec::with_capacity(16 + set.len() * 80);
        buf.push(TAG_VALIDATOR_SET);
        put_u64(&mut buf, set.len() as u64);
        for v in &set.validators {
            put_bytes(&mut buf, &v.address);
            put_bytes(&mut buf, &v.pub_key.0);
            put_i64(&mut buf, v.voting_power);
        }
        sha256(&buf)
    }

    /// Hash of a sampled voter set, as committed by `voters_hash`.
    /// Assigned voting power is part of the preimage: forging power
    /// assignments is as detectable as forging membership.
    pub fn hash_voter_set(&self, set: &VoterSet) -> Hash {
        let mut buf = Vec::with_capacity(16 + set.len() * 88);
        buf.push(TAG_VOTER_SET);
        put_u64(&mut buf, set.len() as u64);
        for v in &set.voters {
            put_bytes(&mut buf, &v.validator.address);
            put_bytes(&mut buf, &v.validator.pub_key.0);
            put_i64(&mut buf, v.validator.voting_power);
            put_i64(&mut buf, v.voting_power);
        }
        sha256(&buf)
    }

    /// The canonical bytes a voter signs: chain id, height and block hash.
    pub fn vote_sign_bytes(&self, chain_id: &str, height: i64, block_hash: &Hash) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64 + chain_id.len());
        buf.push(TAG_VOTE);
        put_bytes(&mut buf, chain_id.as_bytes());
        put_i64(&mut buf, height);
        put_bytes(&mut buf, block_hash);
        buf
    }

    /// Whether a commit structurally binds to the given header under this
    /// codec: same height and the commit's block hash is the header's hash.
    pub fn commit_binds_header(&self, commit: &Commit, header: &Header) -> bool {
        commit.height == header.height && commit.block_hash == self.hash_header(header)
    }
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_u64(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn put_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn put_i64(buf: &mut Vec<u8>, value: i64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// SHA256 hash of arbitrary data.
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}
