pub mod block;
pub mod codec;
pub mod consensus;
pub mod model;
pub mod pow;

pub use block::Block;
pub use consensus::ForkChoice;
pub use model::{Ledger, LedgerSettings, MiningJob};
pub use pow::ProofOfWork;

/// Default Proof-of-Work difficulty (number of leading zero hex digits).
pub const DEFAULT_DIFFICULTY: u32 = 3;

/// Default mining reward, in whole units.
pub const DEFAULT_REWARD: u64 = 10;

/// Default currency code for rewards and transactions without one.
pub const DEFAULT_CURRENCY: &str = "USDT";

/// Nonces tried per block before mining is reported as failed.
pub const DEFAULT_MAX_NONCE: u64 = 100_000_000;

/// `previous_hash` of every genesis block.
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";
