pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Leading zero hex characters a proof hash must carry.
pub const POW_DIFFICULTY: u32 = 4;
/// Candidates handed to rayon per round of the parallel search.
pub const POW_CHUNK_SIZE: u64 = 1 << 16;

pub const GENESIS_INDEX: u64 = 1;
pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_TIMESTAMP: f64 = 0.0;

/// Blocks stamped further ahead of the local clock than this are rejected.
pub const MAX_FUTURE_DRIFT_SECS: f64 = 2.0 * 60.0 * 60.0;

/// Sender used for minted coins (mining and periodic rewards).
pub const COINBASE_SENDER: &str = "0";
pub const MINING_REWARD: u64 = 1;
pub const REWARD_PERIOD: u64 = 4413;
pub const REWARD_AMOUNT: u64 = 100;
pub const ISSUANCE_CAP: u64 = 21_000_000;
