//! Chain validity checks and the longest-valid-chain fork-choice rule.

use log::{debug, info};

use super::{Block, GENESIS_PREVIOUS_HASH};
use crate::error::ChainError;

/// Checks linkage and hash integrity of every non-genesis block.
///
/// Stored hashes are trusted to have met the difficulty at seal time; use
/// [`validate_with_difficulty`] to re-check that as well.
pub fn validate(chain: &[Block]) -> Result<(), ChainError> {
    validate_inner(chain, None)
}

/// [`validate`] plus a leading-zero check against `difficulty`.
pub fn validate_with_difficulty(chain: &[Block], difficulty: u32) -> Result<(), ChainError> {
    validate_inner(chain, Some(difficulty))
}

pub fn is_valid(chain: &[Block]) -> bool {
    validate(chain).is_ok()
}

fn validate_inner(chain: &[Block], difficulty: Option<u32>) -> Result<(), ChainError> {
    if chain.is_empty() {
        return Err(ChainError::Empty);
    }

    for pair in chain.windows(2) {
        let (prev, current) = (&pair[0], &pair[1]);

        if current.previous_hash != prev.hash {
            return Err(ChainError::BrokenLink {
                index: current.index,
            });
        }
        if !current.has_valid_hash() {
            return Err(ChainError::HashMismatch {
                index: current.index,
            });
        }
        if difficulty.is_some_and(|d| !current.meets_difficulty(d)) {
            return Err(ChainError::DifficultyNotMet {
                index: current.index,
            });
        }
    }
    Ok(())
}

/// Structural checks a peer chain must pass before it can be adopted:
/// `chain[0]` is an intact genesis block and every index equals its position.
pub fn check_well_formed(chain: &[Block]) -> Result<(), ChainError> {
    let genesis = chain.first().ok_or(ChainError::Empty)?;
    if genesis.index != 0
        || genesis.previous_hash != GENESIS_PREVIOUS_HASH
        || !genesis.has_valid_hash()
    {
        return Err(ChainError::InvalidGenesis);
    }

    for (position, block) in chain.iter().enumerate() {
        if block.index != position as u64 {
            return Err(ChainError::IndexMismatch {
                position: position as u64,
                index: block.index,
            });
        }
    }
    Ok(())
}

/// Outcome of comparing a candidate chain against the local one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkChoice {
    /// Candidate is strictly longer and valid; it should replace local.
    Replace,
    /// Candidate is not longer. Ties favor the local chain.
    KeepShorter { local: usize, candidate: usize },
    /// Candidate is longer but fails validation.
    KeepInvalid(ChainError),
}

impl ForkChoice {
    pub fn is_replace(&self) -> bool {
        matches!(self, ForkChoice::Replace)
    }
}

/// Longest-valid-chain rule (by block count, not cumulative work).
pub fn resolve(local: &[Block], candidate: &[Block]) -> ForkChoice {
    resolve_with(local, candidate, validate)
}

/// [`resolve`] using difficulty-checking validation.
pub fn resolve_strict(local: &[Block], candidate: &[Block], difficulty: u32) -> ForkChoice {
    resolve_with(local, candidate, |c| validate_with_difficulty(c, difficulty))
}

fn resolve_with<F>(local: &[Block], candidate: &[Block], check: F) -> ForkChoice
where
    F: Fn(&[Block]) -> Result<(), ChainError>,
{
    if candidate.len() <= local.len() {
        debug!(
            "CONSENSUS - keeping local chain (local={}, candidate={})",
            local.len(),
            candidate.len()
        );
        return ForkChoice::KeepShorter {
            local: local.len(),
            candidate: candidate.len(),
        };
    }

    match check_well_formed(candidate).and_then(|()| check(candidate)) {
        Ok(()) => {
            info!(
                "CONSENSUS - candidate chain wins (local={}, candidate={})",
                local.len(),
                candidate.len()
            );
            ForkChoice::Replace
        }
        Err(e) => {
            info!("CONSENSUS - rejecting longer candidate chain: {e}");
            ForkChoice::KeepInvalid(e)
        }
    }
}
