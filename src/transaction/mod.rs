pub mod amount;
pub mod model;

pub use amount::{Amount, UNITS_PER_WHOLE};
pub use model::Transaction;

/// Reserved sender id for coinbase, genesis and filler transactions.
pub const NETWORK_SENDER: &str = "Network";

/// Receiver of the synthetic transaction carried by every genesis block.
pub const GENESIS_RECEIVER: &str = "genesis";
