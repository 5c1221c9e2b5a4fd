pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_PROOF: &str = "0";
pub const GENESIS_DATA: &str = "Hello World!";
/// Attempts between two looks at a miner's cancel token.
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;
/// Nonces handed to the thread pool per round of a parallel search.
pub const PARALLEL_BATCH_SIZE: u64 = 1 << 16;
