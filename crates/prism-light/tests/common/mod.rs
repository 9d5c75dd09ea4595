//! Shared chain fixtures: deterministic BLS keys, signed headers and
//! forked (attacking) chains for divergence scenarios.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use blst::min_pk::SecretKey;

use prism_core::codec::sha256;
use prism_core::{
    select_voters, BlsPublicKey, BlsSignature, Codec, Commit, CommitSig, Hash, Header, LightBlock,
    SignedHeader, TrustOptions, Validator, ValidatorSet, VoterParams, BLS_DST,
};
use prism_light::client::{Client, ClientError, ClientOptions};
use prism_light::provider::Provider;
use prism_light::store::MemoryStore;

pub const CHAIN_ID: &str = "prism-test";
pub const BASE_TIME: u64 = 1_700_000_000;
pub const TRUSTING_PERIOD: Duration = Duration::from_secs(4 * 3600);

/// Route client log output through the test harness. Silent unless the
/// test binary is run with log capturing, e.g. `cargo test -- --nocapture`
/// with `RUST_LOG` set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Builds blocks for one (honest or attacking) view of a chain, with a
/// fixed validator set derived from a key seed.
pub struct ChainBuilder {
    pub codec: Codec,
    pub params: VoterParams,
    keys: Vec<SecretKey>,
    pub validator_set: ValidatorSet,
}

impl ChainBuilder {
    pub fn new(key_seed: &str, n_validators: usize) -> Self {
        let mut keys = Vec::with_capacity(n_validators);
        let mut validators = Vec::with_capacity(n_validators);
        for i in 0..n_validators {
            let ikm = sha256(&[key_seed.as_bytes(), &(i as u64).to_be_bytes()].concat());
            let sk = SecretKey::key_gen(&ikm, &[]).unwrap();
            let pk_bytes = sk.sk_to_pk().to_bytes();
            let mut address = [0u8; 20];
            address.copy_from_slice(&sha256(&pk_bytes)[..20]);
            validators.push(Validator {
                address,
                pub_key: BlsPublicKey(pk_bytes),
                voting_power: 10,
            });
            keys.push(sk);
        }
        Self {
            codec: Codec::new(),
            params: VoterParams::default(),
            keys,
            validator_set: ValidatorSet::new(validators),
        }
    }

    /// Build a fully signed block at `height` on top of `last_block_hash`.
    /// `app_tag` seeds the app hash, so two builders can produce
    /// conflicting contents for the same height.
    pub fn block(&self, height: i64, last_block_hash: Hash, app_tag: &[u8]) -> LightBlock {
        let proof_hash = sha256(&[b"vrf".as_slice(), &height.to_be_bytes()].concat());
        let voter_set = select_voters(&self.validator_set, &proof_hash, &self.params).unwrap();
        let vals_hash = self.codec.hash_validator_set(&self.validator_set);

        let header = Header {
            chain_id: CHAIN_ID.to_string(),
            height,
            time: BASE_TIME + height as u64 * 60,
            last_block_hash,
            validators_hash: vals_hash,
            next_validators_hash: vals_hash,
            voters_hash: self.codec.hash_voter_set(&voter_set),
            proof_hash,
            app_hash: sha256(app_tag),
            consensus_hash: sha256(b"consensus"),
            results_hash: sha256(b"results"),
            proposer_address: self.validator_set.validators[0].address,
        };

        let block_hash = self.codec.hash_header(&header);
        let sign_bytes = self.codec.vote_sign_bytes(CHAIN_ID, height, &block_hash);
        let signatures = voter_set
            .voters
            .iter()
            .map(|voter| {
                let sk = self
                    .keys
                    .iter()
                    .find(|k| k.sk_to_pk().to_bytes() == voter.validator.pub_key.0)
                    .unwrap();
                CommitSig {
                    voter_address: voter.validator.address,
                    timestamp: header.time,
                    signature: BlsSignature(sk.sign(&sign_bytes, BLS_DST, &[]).to_bytes()),
                }
            })
            .collect();

        LightBlock {
            signed_header: SignedHeader {
                header,
                commit: Commit {
                    height,
                    block_hash,
                    signatures,
                },
            },
            validator_set: self.validator_set.clone(),
            voter_set,
        }
    }

    /// An honest chain of `heights` blocks.
    pub fn chain(&self, heights: i64) -> Vec<LightBlock> {
        let mut blocks = Vec::with_capacity(heights as usize);
        let mut last = [0u8; 32];
        for height in 1..=heights {
            let block = self.block(height, last, b"app");
            last = self.codec.hash_header(&block.signed_header.header);
            blocks.push(block);
        }
        blocks
    }

    /// An equivocation fork of `honest`: the same voters sign different
    /// block contents from `fork_height` onward.
    pub fn fork_equivocation(&self, honest: &[LightBlock], fork_height: i64) -> Vec<LightBlock> {
        let mut blocks: Vec<LightBlock> = honest[..(fork_height - 1) as usize].to_vec();
        let mut last = match blocks.last() {
            Some(block) => self.codec.hash_header(&block.signed_header.header),
            None => [0u8; 32],
        };
        for height in fork_height..=honest.len() as i64 {
            let block = self.block(height, last, b"equivocated-app");
            last = self.codec.hash_header(&block.signed_header.header);
            blocks.push(block);
        }
        blocks
    }
}

/// A lunatic fork of `honest`: from `fork_height` onward the blocks claim
/// a forged validator set (the attacker's), signed by the attacker's keys.
pub fn fork_lunatic(
    honest: &[LightBlock],
    attacker: &ChainBuilder,
    fork_height: i64,
) -> Vec<LightBlock> {
    let codec = Codec::new();
    let mut blocks: Vec<LightBlock> = honest[..(fork_height - 1) as usize].to_vec();
    let mut last = match blocks.last() {
        Some(block) => codec.hash_header(&block.signed_header.header),
        None => [0u8; 32],
    };
    for height in fork_height..=honest.len() as i64 {
        let block = attacker.block(height, last, b"app");
        last = codec.hash_header(&block.signed_header.header);
        blocks.push(block);
    }
    blocks
}

/// Construct a client anchored at the primary's first block, with a retry
/// budget of one so tests stay fast.
pub async fn new_client(
    primary: Arc<dyn Provider>,
    witnesses: Vec<Arc<dyn Provider>>,
    store: Arc<MemoryStore>,
) -> Result<Client, ClientError> {
    init_tracing();
    let codec = Codec::new();
    let anchor = primary.light_block(1).await.unwrap();
    let hash = codec.hash_header(&anchor.signed_header.header);
    Client::new(
        CHAIN_ID,
        codec,
        TrustOptions {
            period: TRUSTING_PERIOD,
            height: 1,
            hash,
        },
        primary,
        witnesses,
        store,
        VoterParams::default(),
        ClientOptions {
            max_retry_attempts: 1,
        },
    )
    .await
}
