use serde::{Deserialize, Serialize};

use super::{Amount, GENESIS_RECEIVER, NETWORK_SENDER};

/// A value transfer between two account ids.
///
/// There is no account model: sender and receiver are opaque strings and
/// duplicates are allowed. Field order here is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: Amount,
    pub currency: String,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: Amount,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            currency: currency.into(),
        }
    }

    /// Mining reward paid by the network to `miner`.
    pub fn coinbase(miner: impl Into<String>, reward: Amount, currency: impl Into<String>) -> Self {
        Self::new(NETWORK_SENDER, miner, reward, currency)
    }

    /// Zero-value placeholder stored in the genesis block.
    pub fn genesis(currency: impl Into<String>) -> Self {
        Self::new(NETWORK_SENDER, GENESIS_RECEIVER, Amount::ZERO, currency)
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == NETWORK_SENDER
    }
}
