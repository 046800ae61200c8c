use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::codec::{self, HashInput};
use super::GENESIS_PREVIOUS_HASH;
use crate::transaction::Transaction;

/// A single block in the chain holding an ordered list of transactions.
///
/// Field order is the wire order:
/// `{index, previous_hash, timestamp, nonce, hash, transactions}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: i64, // Unix timestamp in milliseconds (UTC)
    pub nonce: u64,     // Proof-of-Work nonce
    pub hash: String,   // Empty until sealed
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create the genesis block (first block in the chain).
    pub fn genesis(currency: &str) -> Self {
        let mut block = Self::new(
            0,
            GENESIS_PREVIOUS_HASH.to_string(),
            vec![Transaction::genesis(currency)],
        );
        block.hash = block.compute_hash();
        block
    }

    /// Create an unsealed candidate block stamped now.
    pub fn new(index: u64, previous_hash: String, transactions: Vec<Transaction>) -> Self {
        Self::new_with_timestamp(index, previous_hash, transactions, Utc::now().timestamp_millis())
    }

    pub fn new_with_timestamp(
        index: u64,
        previous_hash: String,
        transactions: Vec<Transaction>,
        timestamp: i64,
    ) -> Self {
        Self {
            index,
            previous_hash,
            timestamp,
            nonce: 0,
            hash: String::new(),
            transactions,
        }
    }

    /// Canonical hash of this block's contents (excluding `hash` itself).
    pub fn compute_hash(&self) -> String {
        codec::canonical_hash(&self.hash_input())
    }

    pub fn hash_input(&self) -> HashInput<'_> {
        HashInput {
            index: self.index,
            previous_hash: &self.previous_hash,
            timestamp: self.timestamp,
            transactions: &self.transactions,
            nonce: self.nonce,
        }
    }

    pub fn is_sealed(&self) -> bool {
        !self.hash.is_empty()
    }

    /// Stored hash matches the recomputed hash.
    pub fn has_valid_hash(&self) -> bool {
        self.is_sealed() && self.hash == self.compute_hash()
    }

    /// Stored hash starts with at least `difficulty` zero hex digits.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        codec::leading_zero_digits(&self.hash) >= difficulty as usize
    }
}
