use thiserror::Error;

/// Reasons a candidate chain fails validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainFault {
    #[error("first block is not the shared genesis block")]
    ForeignGenesis,

    #[error("block {index} does not follow index {previous}")]
    IndexGap { previous: u64, index: u64 },

    #[error("block {index} previous_hash does not match its predecessor")]
    BrokenLink { index: u64 },

    #[error("block {index} carries proof {proof} which is invalid against {last_proof}")]
    InvalidProof {
        index: u64,
        last_proof: u64,
        proof: u64,
    },

    #[error("block {index} timestamp {timestamp} is not after {previous}")]
    TimestampNotIncreasing {
        index: u64,
        previous: f64,
        timestamp: f64,
    },

    #[error("block {index} timestamp {timestamp} is too far in the future")]
    TimestampInFuture { index: u64, timestamp: f64 },

    #[error("block {index} merkle root does not match its transactions")]
    MerkleMismatch { index: u64 },
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("leaf not found in merkle tree")]
    LeafNotFound,

    #[error("cannot build a merkle tree without leaves")]
    EmptyTree,

    #[error("no proof found for last proof {last_proof} after {attempts} attempts")]
    ProofNotFound { last_proof: u64, attempts: u64 },

    #[error("invalid node address: {0:?}")]
    InvalidAddress(String),

    #[error("malformed chain: {0}")]
    MalformedChain(#[from] ChainFault),

    #[error("canonical encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
