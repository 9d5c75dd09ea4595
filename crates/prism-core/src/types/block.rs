use serde::{Deserialize, Serialize};

/// Number of bytes in a BLS12-381 public key (compressed).
pub const BLS_PUBKEY_LEN: usize = 48;

/// Number of bytes in a BLS12-381 signature (compressed).
pub const BLS_SIGNATURE_LEN: usize = 96;

/// Domain separation tag for Prism commit signatures.
pub const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// A 32-byte hash value.
pub type Hash = [u8; 32];

/// A 20-byte validator address.
pub type Address = [u8; 20];

/// A BLS12-381 public key (48 bytes, compressed G1 point).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsPublicKey(pub [u8; BLS_PUBKEY_LEN]);

impl Serialize for BlsPublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for BlsPublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl BlsPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        if bytes.len() != BLS_PUBKEY_LEN {
            return Err("Invalid BLS public key length");
        }
        let mut arr = [0u8; BLS_PUBKEY_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

/// A BLS12-381 signature (96 bytes, compressed G2 point).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsSignature(pub [u8; BLS_SIGNATURE_LEN]);

impl Serialize for BlsSignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for BlsSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl BlsSignature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        if bytes.len() != BLS_SIGNATURE_LEN {
            return Err("Invalid BLS signature length");
        }
        let mut arr = [0u8; BLS_SIGNATURE_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

/// A block header: the minimal view of a block a light client needs.
/// Everything a header commits to (validators, voters, app state) is
/// checked against these hashes before being trusted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Chain this header belongs to.
    pub chain_id: String,
    /// Block height, starting at 1.
    pub height: i64,
    /// Block time as unix seconds.
    pub time: u64,
    /// Hash of the previous block's header (zero for the first block).
    pub last_block_hash: Hash,
    /// Hash of the validator set eligible at this height.
    pub validators_hash: Hash,
    /// Hash of the validator set eligible at the next height.
    pub next_validators_hash: Hash,
    /// Hash of the sampled voter set required to sign this height.
    pub voters_hash: Hash,
    /// Per-height VRF output, the seed that voter sampling is derived from.
    pub proof_hash: Hash,
    /// Application state hash after the previous block.
    pub app_hash: Hash,
    /// Hash of the consensus parameters at this height.
    pub consensus_hash: Hash,
    /// Hash of the results of the previous block's transactions.
    pub results_hash: Hash,
    /// Address of the validator that proposed this block.
    pub proposer_address: Address,
}

/// A single voter's signature over a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSig {
    /// Address of the voter that signed.
    pub voter_address: Address,
    /// Time at which the vote was cast, unix seconds.
    pub timestamp: u64,
    /// BLS signature over the canonical vote bytes.
    pub signature: BlsSignature,
}

/// The commit for a block: the set of voter signatures binding a block hash
/// to a height. Only present signatures are carried; absent voters simply
/// have no entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Height this commit is for.
    pub height: i64,
    /// Hash of the header being committed.
    pub block_hash: Hash,
    /// Signatures from voter set members.
    pub signatures: Vec<CommitSig>,
}

/// A header together with the commit that signed it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedHeader {
    pub header: Header,
    pub commit: Commit,
}

/// A validator eligible to be sampled into the voter set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub address: Address,
    pub pub_key: BlsPublicKey,
    pub voting_power: i64,
}

/// The full set of validators eligible at one height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    pub validators: Vec<Validator>,
}

impl ValidatorSet {
    pub fn new(validators: Vec<Validator>) -> Self {
        Self { validators }
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Total voting power of the full set. Saturates at `i64::MAX` so an
    /// adversarially large set cannot overflow threshold math.
    pub fn total_voting_power(&self) -> i64 {
        saturating_power_sum(self.validators.iter().map(|v| v.voting_power))
    }
}

fn saturating_power_sum(powers: impl Iterator<Item = i64>) -> i64 {
    let total: i128 = powers.map(|p| p as i128).sum();
    total.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// A validator sampled into the voter set, carrying the voting power
/// assigned to it for threshold math at this height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub validator: Validator,
    /// Power counted toward the commit threshold. May differ from the
    /// validator's stake once sampling rescales powers.
    pub voting_power: i64,
}

/// The sampled subset of a validator set actually required to sign a height.
/// Never authoritative on its own: recomputing it from the parent validator
/// set, the header's proof hash and the voter params must reproduce it
/// bit-for-bit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterSet {
    pub voters: Vec<Voter>,
}

impl VoterSet {
    pub fn new(voters: Vec<Voter>) -> Self {
        Self { voters }
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    /// Total assigned voting power of the sampled set. Saturates like
    /// [`ValidatorSet::total_voting_power`].
    pub fn total_voting_power(&self) -> i64 {
        saturating_power_sum(self.voters.iter().map(|v| v.voting_power))
    }

    /// Look up a voter by address.
    pub fn voter_by_address(&self, address: &Address) -> Option<&Voter> {
        self.voters.iter().find(|v| &v.validator.address == address)
    }
}

/// An immutable snapshot of chain state at one height: the signed header
/// plus the validator and voter sets authorized to produce it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightBlock {
    pub signed_header: SignedHeader,
    pub validator_set: ValidatorSet,
    pub voter_set: VoterSet,
}

impl LightBlock {
    pub fn height(&self) -> i64 {
        self.signed_header.header.height
    }

    pub fn time(&self) -> u64 {
        self.signed_header.header.time
    }

    pub fn chain_id(&self) -> &str {
        &self.signed_header.header.chain_id
    }
}
