//! Canonical block encoding and content hash.
//!
//! The preimage is compact JSON with object keys in sorted order. Objects
//! are built as `BTreeMap`s rather than `serde_json::Value`, so the order
//! holds even if serde_json's `preserve_order` feature is enabled.

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::transaction::Transaction;

/// Hex length of a SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// The fields of a block that are covered by its hash.
#[derive(Debug, Clone, Copy)]
pub struct HashInput<'a> {
    pub index: u64,
    pub previous_hash: &'a str,
    pub timestamp: i64,
    pub transactions: &'a [Transaction],
    pub nonce: u64,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Field<'a> {
    Unsigned(u64),
    Signed(i64),
    Text(&'a str),
    Transactions(Vec<BTreeMap<&'static str, String>>),
}

fn transaction_fields(tx: &Transaction) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("amount", tx.amount.to_string()),
        ("currency", tx.currency.clone()),
        ("receiver", tx.receiver.clone()),
        ("sender", tx.sender.clone()),
    ])
}

/// Canonical byte encoding of the hashed fields.
pub fn canonical_bytes(input: &HashInput<'_>) -> Vec<u8> {
    let fields = BTreeMap::from([
        ("index", Field::Unsigned(input.index)),
        ("previous_hash", Field::Text(input.previous_hash)),
        ("timestamp", Field::Signed(input.timestamp)),
        (
            "transactions",
            Field::Transactions(input.transactions.iter().map(transaction_fields).collect()),
        ),
        ("nonce", Field::Unsigned(input.nonce)),
    ]);
    serde_json::to_vec(&fields).expect("serialize hash preimage")
}

/// Lowercase hex SHA-256 of the canonical encoding.
pub fn canonical_hash(input: &HashInput<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes(input));
    hex::encode(hasher.finalize())
}

/// Number of leading `'0'` hex digits in `hash`.
pub fn leading_zero_digits(hash: &str) -> usize {
    hash.bytes().take_while(|b| *b == b'0').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Amount;

    fn sample_txs() -> Vec<Transaction> {
        vec![
            Transaction::new("Alice", "Bob", Amount::from_whole(50).unwrap(), "USDT"),
            Transaction::coinbase("Miner1", Amount::from_whole(10).unwrap(), "USDT"),
        ]
    }

    #[test]
    fn keys_are_sorted_in_preimage() {
        let txs = sample_txs();
        let input = HashInput {
            index: 1,
            previous_hash: "abc",
            timestamp: 1_600_000_000_000,
            transactions: &txs,
            nonce: 7,
        };
        let text = String::from_utf8(canonical_bytes(&input)).unwrap();
        assert!(text.starts_with(r#"{"index":1,"nonce":7,"previous_hash":"abc","timestamp":1600000000000,"transactions":[{"amount":"50","currency":"USDT","receiver":"Bob","sender":"Alice"}"#));
    }

    #[test]
    fn transaction_fields_match_wire_encoding() {
        let tx = Transaction::new("Alice", "Bob", "12.5".parse().unwrap(), "BTC");
        let wire: BTreeMap<String, String> =
            serde_json::from_value(serde_json::to_value(&tx).unwrap()).unwrap();
        let hashed: BTreeMap<String, String> = transaction_fields(&tx)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(wire, hashed);
    }

    #[test]
    fn hash_is_deterministic_and_fixed_length() {
        let txs = sample_txs();
        let input = HashInput {
            index: 3,
            previous_hash: "00ff",
            timestamp: 42,
            transactions: &txs,
            nonce: 0,
        };
        let h1 = canonical_hash(&input);
        let h2 = canonical_hash(&input);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), HASH_HEX_LEN);
        assert!(h1.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn transaction_order_changes_hash() {
        let txs = sample_txs();
        let mut reversed = txs.clone();
        reversed.reverse();
        let a = HashInput {
            index: 1,
            previous_hash: "p",
            timestamp: 1,
            transactions: &txs,
            nonce: 0,
        };
        let b = HashInput {
            transactions: &reversed,
            ..a
        };
        assert_ne!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn counts_leading_zero_digits() {
        assert_eq!(leading_zero_digits("000a1"), 3);
        assert_eq!(leading_zero_digits("a000"), 0);
        assert_eq!(leading_zero_digits(""), 0);
    }
}
