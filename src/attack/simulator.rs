use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::blockchain::{ForkChoice, Ledger};
use crate::error::LedgerError;
use crate::transaction::{Amount, NETWORK_SENDER, Transaction};

pub const DEFAULT_HASH_POWER: f64 = 0.6;
pub const DEFAULT_MAX_PRIVATE_BLOCKS: usize = 64;
pub const HONEST_MINER_ID: &str = "HonestMiner";
pub const ATTACKER_ID: &str = "Attacker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Race,
    Majority,
}

/// What happened in one attack run.
#[derive(Debug, Clone, Serialize)]
pub struct AttackOutcome {
    pub run_id: String,
    pub kind: AttackKind,
    pub success: bool,
    /// Honest chain length after the scenario.
    pub honest_length: usize,
    /// Attacker fork length when it was revealed.
    pub attacker_length: usize,
    /// Blocks mined on the attacker fork.
    pub private_blocks: usize,
}

/// Runs double-spend scenarios against an honest ledger.
///
/// `hash_power` is the attacker's share of total mining capacity. It only
/// feeds the race-attack probability model; no competing miners are run.
#[derive(Debug, Clone)]
pub struct AttackSimulator {
    hash_power: f64,
    honest_miner_id: String,
    attacker_id: String,
    max_private_blocks: usize,
}

impl AttackSimulator {
    pub fn new(hash_power: f64) -> Result<Self, LedgerError> {
        if !(hash_power > 0.0 && hash_power < 1.0) {
            return Err(LedgerError::InvalidHashPower(hash_power));
        }
        Ok(Self {
            hash_power,
            honest_miner_id: HONEST_MINER_ID.to_string(),
            attacker_id: ATTACKER_ID.to_string(),
            max_private_blocks: DEFAULT_MAX_PRIVATE_BLOCKS,
        })
    }

    /// Upper bound on blocks mined on the private fork in a majority attack.
    pub fn with_max_private_blocks(mut self, max: usize) -> Self {
        self.max_private_blocks = max.max(1);
        self
    }

    pub fn with_miner_ids(mut self, honest: impl Into<String>, attacker: impl Into<String>) -> Self {
        self.honest_miner_id = honest.into();
        self.attacker_id = attacker.into();
        self
    }

    pub fn hash_power(&self) -> f64 {
        self.hash_power
    }

    pub fn max_private_blocks(&self) -> usize {
        self.max_private_blocks
    }

    /// Race attack using the thread-local RNG.
    pub fn race_attack(
        &self,
        honest: &mut Ledger,
        victim_tx: Transaction,
        attacker_tx: Transaction,
    ) -> Result<AttackOutcome, LedgerError> {
        self.race_attack_with_rng(honest, victim_tx, attacker_tx, &mut rand::thread_rng())
    }

    /// The honest network confirms `victim_tx`; the attacker mines
    /// `attacker_tx` on a copy of that chain. The attacker wins a weighted
    /// coin flip only with majority hash power (`p > 0.5` and `draw < p`),
    /// after which its chain goes through fork choice.
    pub fn race_attack_with_rng<R: Rng + ?Sized>(
        &self,
        honest: &mut Ledger,
        victim_tx: Transaction,
        attacker_tx: Transaction,
        rng: &mut R,
    ) -> Result<AttackOutcome, LedgerError> {
        check_double_spend(&victim_tx, &attacker_tx)?;
        let run_id = Uuid::new_v4().to_string();
        info!("ATTACK[{run_id}] - race attack started (p={})", self.hash_power);

        honest.submit(victim_tx)?;
        let honest_index = honest.mine(&self.honest_miner_id)?.index;
        info!("ATTACK[{run_id}] - victim sees transaction in block #{honest_index}");

        let mut attacker = honest.fork();
        attacker.submit(attacker_tx)?;
        let fake_index = attacker.mine(&self.attacker_id)?.index;
        info!("ATTACK[{run_id}] - attacker mined conflicting block #{fake_index}");

        let draw: f64 = rng.r#gen();
        let wins_race = self.hash_power > 0.5 && draw < self.hash_power;
        debug!("ATTACK[{run_id}] - race draw={draw:.4} wins={wins_race}");

        let attacker_length = attacker.len();
        let success = wins_race && honest.replace_chain(attacker.into_chain()).is_replace();
        if success {
            warn!("ATTACK[{run_id}] - race attack SUCCESS, attacker history accepted");
        } else {
            info!("ATTACK[{run_id}] - race attack FAILED, honest chain kept");
        }

        Ok(AttackOutcome {
            run_id,
            kind: AttackKind::Race,
            success,
            honest_length: honest.len(),
            attacker_length,
            private_blocks: 1,
        })
    }

    /// The honest network confirms `victim_tx`; the attacker forks from the
    /// block before it, mines `attacker_tx` plus zero-value filler blocks
    /// until the private chain is strictly longer, then reveals it.
    pub fn majority_attack(
        &self,
        honest: &mut Ledger,
        victim_tx: Transaction,
        attacker_tx: Transaction,
    ) -> Result<AttackOutcome, LedgerError> {
        check_double_spend(&victim_tx, &attacker_tx)?;
        let run_id = Uuid::new_v4().to_string();
        info!("ATTACK[{run_id}] - majority attack started");

        honest.submit(victim_tx)?;
        let victim_index = honest.mine(&self.honest_miner_id)?.index;
        info!("ATTACK[{run_id}] - victim sees transaction confirmed in block #{victim_index}");

        let mut private = honest.fork_at(honest.len() - 1);
        private.submit(attacker_tx)?;
        let first = private.mine(&self.attacker_id)?.index;
        debug!("ATTACK[{run_id}] - private block #{first}");
        let mut private_blocks = 1;

        while private.len() <= honest.len() && private_blocks < self.max_private_blocks {
            let filler = Transaction::new(
                NETWORK_SENDER,
                self.attacker_id.as_str(),
                Amount::ZERO,
                private.reward_currency(),
            );
            private.push_pending(filler);
            let index = private.mine(&self.attacker_id)?.index;
            private_blocks += 1;
            debug!("ATTACK[{run_id}] - private block #{index}");
        }

        let attacker_length = private.len();
        let success = match honest.replace_chain(private.into_chain()) {
            ForkChoice::Replace => true,
            other => {
                warn!("ATTACK[{run_id}] - private chain not accepted: {other:?}");
                false
            }
        };
        if success {
            warn!("ATTACK[{run_id}] - majority attack SUCCESS, private chain replaced honest chain");
        } else {
            info!("ATTACK[{run_id}] - majority attack FAILED after {private_blocks} private blocks");
        }

        Ok(AttackOutcome {
            run_id,
            kind: AttackKind::Majority,
            success,
            honest_length: honest.len(),
            attacker_length,
            private_blocks,
        })
    }
}

/// Both legs must spend the same funds to different receivers.
fn check_double_spend(victim: &Transaction, attacker: &Transaction) -> Result<(), LedgerError> {
    if victim.sender != attacker.sender {
        return Err(LedgerError::InvalidAttackPair(
            "transactions must share a sender".into(),
        ));
    }
    if victim.amount != attacker.amount || victim.currency != attacker.currency {
        return Err(LedgerError::InvalidAttackPair(
            "transactions must move the same amount and currency".into(),
        ));
    }
    if victim.receiver == attacker.receiver {
        return Err(LedgerError::InvalidAttackPair(
            "transactions must pay different receivers".into(),
        ));
    }
    if !victim.amount.is_positive() {
        return Err(LedgerError::InvalidAmount(
            "amount must be greater than zero".into(),
        ));
    }
    Ok(())
}
