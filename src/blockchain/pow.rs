use log::debug;

use super::Block;
use super::codec::leading_zero_digits;
use crate::error::LedgerError;

/// Brute-force nonce search for a hash with `difficulty` leading zero hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    pub difficulty: u32,
    /// Number of nonces tried before giving up. `None` searches forever.
    pub max_nonce: Option<u64>,
}

impl ProofOfWork {
    pub fn new(difficulty: u32) -> Self {
        Self {
            difficulty,
            max_nonce: None,
        }
    }

    pub fn with_max_nonce(mut self, max_nonce: u64) -> Self {
        self.max_nonce = Some(max_nonce);
        self
    }

    /// Finds the smallest nonce starting from 0 whose hash meets the target
    /// and stores nonce and hash in `block`. On failure the block is left
    /// unsealed.
    pub fn seal(&self, block: &mut Block) -> Result<(), LedgerError> {
        let target = self.difficulty as usize;
        block.hash.clear();

        let mut nonce: u64 = 0;
        loop {
            if self.max_nonce.is_some_and(|max| nonce >= max) {
                debug!(
                    "POW - gave up on block #{} after {} nonces (difficulty={})",
                    block.index, nonce, self.difficulty
                );
                block.nonce = 0;
                return Err(LedgerError::MiningFailure {
                    index: block.index,
                    attempts: nonce,
                });
            }

            block.nonce = nonce;
            let hash = block.compute_hash();
            if leading_zero_digits(&hash) >= target {
                block.hash = hash;
                return Ok(());
            }

            nonce = match nonce.checked_add(1) {
                Some(n) => n,
                None => {
                    return Err(LedgerError::MiningFailure {
                        index: block.index,
                        attempts: u64::MAX,
                    });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Amount, Transaction};

    fn candidate() -> Block {
        let tx = Transaction::new("Alice", "Bob", Amount::from_whole(1).unwrap(), "USDT");
        Block::new_with_timestamp(1, "prev".into(), vec![tx], 1_700_000_000_000)
    }

    #[test]
    fn mining_produces_leading_zeros() {
        let mut b = candidate();
        ProofOfWork::new(2).seal(&mut b).unwrap();
        assert!(b.hash.starts_with("00"));
        assert!(b.has_valid_hash());
        assert!(b.meets_difficulty(2));
    }

    #[test]
    fn finds_the_smallest_nonce() {
        let mut b = candidate();
        ProofOfWork::new(1).seal(&mut b).unwrap();
        let winner = b.nonce;

        let mut probe = candidate();
        for nonce in 0..winner {
            probe.nonce = nonce;
            assert!(!probe.compute_hash().starts_with('0'));
        }
    }

    #[test]
    fn zero_difficulty_accepts_nonce_zero() {
        let mut b = candidate();
        ProofOfWork::new(0).seal(&mut b).unwrap();
        assert_eq!(b.nonce, 0);
        assert!(b.has_valid_hash());
    }

    #[test]
    fn ceiling_reports_mining_failure() {
        let mut b = candidate();
        // 64 zero digits will not be found in 10 tries.
        let err = ProofOfWork::new(64)
            .with_max_nonce(10)
            .seal(&mut b)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::MiningFailure {
                index: 1,
                attempts: 10
            }
        ));
        assert!(!b.is_sealed());
    }
}
