use thiserror::Error;

/// Why a chain failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,
    #[error("first block is not a well-formed genesis block")]
    InvalidGenesis,
    #[error("block at position {position} carries index {index}")]
    IndexMismatch { position: u64, index: u64 },
    #[error("block {index} does not link to the previous block hash")]
    BrokenLink { index: u64 },
    #[error("block {index} stored hash does not match its contents")]
    HashMismatch { index: u64 },
    #[error("block {index} hash does not meet the difficulty target")]
    DifficultyNotMet { index: u64 },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("mining aborted for block {index} after {attempts} nonces")]
    MiningFailure { index: u64, attempts: u64 },

    #[error("block {index} was sealed against a tip that is no longer current")]
    StaleBlock { index: u64 },

    #[error("invalid chain: {0}")]
    InvalidChain(#[from] ChainError),

    #[error("invalid double-spend pair: {0}")]
    InvalidAttackPair(String),

    #[error("attacker hash power must be in (0, 1), got {0}")]
    InvalidHashPower(f64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
