use log::{debug, info};

use super::consensus::{self, ForkChoice};
use super::{
    Block, DEFAULT_CURRENCY, DEFAULT_DIFFICULTY, DEFAULT_MAX_NONCE, DEFAULT_REWARD, ProofOfWork,
};
use crate::error::{ChainError, LedgerError};
use crate::transaction::{Amount, Transaction, UNITS_PER_WHOLE};

/// Construction parameters shared by a ledger and every fork taken from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    pub difficulty: u32,
    pub reward_amount: Amount,
    pub reward_currency: String,
    /// Nonce ceiling for each block; `None` mines without a bound.
    pub max_nonce: Option<u64>,
    /// Also re-check difficulty when validating chains.
    pub strict_validation: bool,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            reward_amount: Amount::from_units(DEFAULT_REWARD * UNITS_PER_WHOLE),
            reward_currency: DEFAULT_CURRENCY.to_string(),
            max_nonce: Some(DEFAULT_MAX_NONCE),
            strict_validation: false,
        }
    }
}

impl LedgerSettings {
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    fn pow(&self) -> ProofOfWork {
        ProofOfWork {
            difficulty: self.difficulty,
            max_nonce: self.max_nonce,
        }
    }
}

/// A candidate block built from a ledger snapshot, sealed outside the ledger.
#[derive(Debug, Clone)]
pub struct MiningJob {
    block: Block,
    pow: ProofOfWork,
    taken: usize,
}

impl MiningJob {
    pub fn seal(&mut self) -> Result<(), LedgerError> {
        self.pow.seal(&mut self.block)
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn difficulty(&self) -> u32 {
        self.pow.difficulty
    }
}

/// In-memory chain with a pending-transaction pool and Proof-of-Work mining.
///
/// The chain is never empty: `chain[0]` is the genesis block.
#[derive(Debug)]
pub struct Ledger {
    settings: LedgerSettings,
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

impl Ledger {
    /// Initialize a new ledger with a genesis block stamped now.
    pub fn new(settings: LedgerSettings) -> Self {
        let genesis = Block::genesis(&settings.reward_currency);
        Self {
            settings,
            chain: vec![genesis],
            pending: Vec::new(),
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn difficulty(&self) -> u32 {
        self.settings.difficulty
    }

    pub fn reward_amount(&self) -> Amount {
        self.settings.reward_amount
    }

    pub fn reward_currency(&self) -> &str {
        &self.settings.reward_currency
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Return the last block in the chain.
    pub fn tip(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger should always have at least the genesis block")
    }

    /// Queue a transfer for the next block. `currency` falls back to the
    /// reward currency.
    pub fn add_transaction(
        &mut self,
        sender: &str,
        receiver: &str,
        amount: Amount,
        currency: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        let currency = currency.unwrap_or(&self.settings.reward_currency);
        let tx = Transaction::new(sender, receiver, amount, currency);
        self.submit(tx.clone())?;
        Ok(tx)
    }

    /// Like [`Ledger::add_transaction`] with the amount still in text form.
    pub fn add_transaction_str(
        &mut self,
        sender: &str,
        receiver: &str,
        amount: &str,
        currency: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        let amount: Amount = amount.parse()?;
        self.add_transaction(sender, receiver, amount, currency)
    }

    /// Queue an already-built transaction. The amount must be positive.
    pub fn submit(&mut self, tx: Transaction) -> Result<(), LedgerError> {
        if !tx.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(
                "amount must be greater than zero".into(),
            ));
        }
        self.push_pending(tx);
        Ok(())
    }

    /// Queue without the positive-amount check (network filler transactions).
    pub(crate) fn push_pending(&mut self, tx: Transaction) {
        debug!(
            "MEMPOOL - {} -> {} {} {} (size {})",
            tx.sender,
            tx.receiver,
            tx.amount,
            tx.currency,
            self.pending.len() + 1
        );
        self.pending.push(tx);
    }

    /// Seal the pending pool plus one coinbase paid to `miner_id` into a new
    /// block. The block is appended and the pool cleared together; on
    /// failure neither changes.
    pub fn mine(&mut self, miner_id: &str) -> Result<&Block, LedgerError> {
        let mut job = self.prepare_block(miner_id);
        job.seal()?;
        self.commit_block(job)
    }

    /// Snapshot the pool and tip into an unsealed block. The job can be
    /// sealed without access to the ledger and handed back to
    /// [`Ledger::commit_block`].
    pub fn prepare_block(&self, miner_id: &str) -> MiningJob {
        let mut txs = self.pending.clone();
        let taken = txs.len();
        txs.push(Transaction::coinbase(
            miner_id,
            self.settings.reward_amount,
            self.settings.reward_currency.as_str(),
        ));

        MiningJob {
            block: Block::new(self.chain.len() as u64, self.tip().hash.clone(), txs),
            pow: self.settings.pow(),
            taken,
        }
    }

    /// Append a sealed job and drop the transactions it included from the
    /// pool. Fails with `StaleBlock` if the tip moved or the snapshotted
    /// pool prefix changed since [`Ledger::prepare_block`].
    pub fn commit_block(&mut self, job: MiningJob) -> Result<&Block, LedgerError> {
        let MiningJob { block, taken, .. } = job;
        let current = block.index == self.chain.len() as u64
            && block.previous_hash == self.tip().hash
            && self.pending.get(..taken) == block.transactions.get(..taken);
        if !current {
            debug!("MINER - block #{} went stale before commit", block.index);
            return Err(LedgerError::StaleBlock { index: block.index });
        }
        if !block.has_valid_hash() {
            return Err(ChainError::HashMismatch { index: block.index }.into());
        }
        if !block.meets_difficulty(self.settings.difficulty) {
            return Err(ChainError::DifficultyNotMet { index: block.index }.into());
        }

        info!(
            "MINER - sealed block #{} (hash={}, nonce={}, txs={})",
            block.index,
            block.hash,
            block.nonce,
            block.transactions.len()
        );
        self.chain.push(block);
        self.pending.drain(..taken);
        Ok(self.tip())
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.settings.strict_validation {
            consensus::validate_with_difficulty(&self.chain, self.settings.difficulty)
        } else {
            consensus::validate(&self.chain)
        }
    }

    /// Validate the entire chain: linkage and hashes (and PoW in strict mode).
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Apply the fork-choice rule against `candidate`, swapping the chain in
    /// a single assignment when it wins. The pending pool is untouched.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> ForkChoice {
        let choice = if self.settings.strict_validation {
            consensus::resolve_strict(&self.chain, &candidate, self.settings.difficulty)
        } else {
            consensus::resolve(&self.chain, &candidate)
        };
        if choice.is_replace() {
            self.chain = candidate;
        }
        choice
    }

    /// Deep copy of the chain with the same settings and an empty pool.
    pub fn fork(&self) -> Ledger {
        self.fork_at(self.chain.len())
    }

    /// Fork from the first `len` blocks (never fewer than genesis).
    pub fn fork_at(&self, len: usize) -> Ledger {
        let len = len.clamp(1, self.chain.len());
        Ledger {
            settings: self.settings.clone(),
            chain: self.chain[..len].to_vec(),
            pending: Vec::new(),
        }
    }

    /// Take the chain out, e.g. to offer it as a fork-choice candidate.
    pub fn into_chain(self) -> Vec<Block> {
        self.chain
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::GENESIS_PREVIOUS_HASH;

    fn ledger() -> Ledger {
        Ledger::new(LedgerSettings::default().with_difficulty(2))
    }

    fn whole(n: u64) -> Amount {
        Amount::from_whole(n).unwrap()
    }

    #[test]
    fn fresh_ledger_has_genesis() {
        let l = ledger();
        assert_eq!(l.len(), 1);
        assert_eq!(l.tip().index, 0);
        assert_eq!(l.tip().previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(l.pending().is_empty());
        assert!(l.is_valid());
    }

    #[test]
    fn add_transaction_defaults_currency() {
        let mut l = ledger();
        let tx = l.add_transaction("Alice", "Bob", whole(50), None).unwrap();
        assert_eq!(tx.currency, "USDT");
        let tx = l.add_transaction("Alice", "Bob", whole(5), Some("BTC")).unwrap();
        assert_eq!(tx.currency, "BTC");
        assert_eq!(l.pending().len(), 2);
        assert_eq!(l.pending()[1], tx);
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let mut l = ledger();
        let err = l.add_transaction("Alice", "Bob", Amount::ZERO, None).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        for bad in ["0", "-5", "ten", ""] {
            assert!(l.add_transaction_str("Alice", "Bob", bad, None).is_err());
        }
        assert!(l.pending().is_empty());
    }

    #[test]
    fn mine_appends_block_with_trailing_coinbase() {
        let mut l = ledger();
        l.add_transaction("Alice", "Bob", whole(50), Some("USDT")).unwrap();
        let before = l.pending().to_vec();

        let block = l.mine("Miner1").unwrap().clone();

        assert_eq!(block.index, 1);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[..1], before[..]);
        let coinbase = &block.transactions[1];
        assert!(coinbase.is_coinbase());
        assert_eq!(coinbase.receiver, "Miner1");
        assert_eq!(coinbase.amount, l.reward_amount());
        assert_eq!(coinbase.currency, l.reward_currency());
        assert!(block.hash.starts_with("00"));
        assert_eq!(l.len(), 2);
        assert!(l.pending().is_empty());
        assert!(l.is_valid());
    }

    #[test]
    fn mine_with_empty_pool_is_coinbase_only() {
        let mut l = ledger();
        let block = l.mine("Solo").unwrap();
        assert_eq!(block.transactions.len(), 1);
        assert!(block.transactions[0].is_coinbase());
    }

    #[test]
    fn mining_failure_leaves_state_unchanged() {
        let mut settings = LedgerSettings::default().with_difficulty(64);
        settings.max_nonce = Some(5);
        let mut l = Ledger::new(settings);
        l.add_transaction("Alice", "Bob", whole(1), None).unwrap();

        let err = l.mine("Miner").unwrap_err();
        assert!(matches!(err, LedgerError::MiningFailure { index: 1, .. }));
        assert_eq!(l.len(), 1);
        assert_eq!(l.pending().len(), 1);
    }

    #[test]
    fn fork_copies_chain_with_empty_pool() {
        let mut l = ledger();
        l.mine("Miner").unwrap();
        l.add_transaction("Alice", "Bob", whole(1), None).unwrap();

        let mut fork = l.fork();
        assert_eq!(fork.chain(), l.chain());
        assert!(fork.pending().is_empty());
        assert_eq!(fork.settings(), l.settings());

        fork.mine("Other").unwrap();
        assert_eq!(l.len(), 2);
        assert_eq!(fork.len(), 3);
    }

    #[test]
    fn fork_at_keeps_at_least_genesis() {
        let mut l = ledger();
        l.mine("Miner").unwrap();
        assert_eq!(l.fork_at(0).len(), 1);
        assert_eq!(l.fork_at(1).tip(), &l.chain()[0]);
        assert_eq!(l.fork_at(99).len(), 2);
    }

    #[test]
    fn replace_chain_follows_longest_valid_rule() {
        let mut honest = ledger();
        honest.mine("Honest").unwrap();

        let mut rival = honest.fork_at(1);
        rival.mine("Rival").unwrap();
        assert!(!honest.replace_chain(rival.chain().to_vec()).is_replace());

        rival.mine("Rival").unwrap();
        let rival_chain = rival.into_chain();
        assert!(honest.replace_chain(rival_chain.clone()).is_replace());
        assert_eq!(honest.chain(), &rival_chain[..]);
    }

    #[test]
    fn tampered_chain_is_invalid() {
        let mut l = ledger();
        l.add_transaction("Alice", "Bob", whole(50), None).unwrap();
        l.mine("Miner").unwrap();
        l.mine("Miner").unwrap();

        let mut chain = l.chain().to_vec();
        chain[1].transactions[0].amount = whole(5_000);
        chain[1].hash = chain[1].compute_hash();
        assert!(!consensus::is_valid(&chain));
    }

    #[test]
    fn forged_peer_chain_does_not_replace() {
        let mut honest = ledger();

        let mut forged = ledger().fork();
        forged.mine("Peer").unwrap();
        forged.mine("Peer").unwrap();
        let mut chain = forged.into_chain();
        chain[0].index = 7;
        chain[0].previous_hash = "deadbeef".into();
        chain[1].index = 99;
        chain[2].index = 100;
        let pow = ProofOfWork::new(2);
        for i in 0..chain.len() {
            if i > 0 {
                chain[i].previous_hash = chain[i - 1].hash.clone();
            }
            pow.seal(&mut chain[i]).unwrap();
        }
        assert!(consensus::is_valid(&chain));

        let choice = honest.replace_chain(chain);
        assert!(matches!(choice, ForkChoice::KeepInvalid(ChainError::InvalidGenesis)));
        assert_eq!(honest.len(), 1);
        assert_eq!(honest.tip().index, 0);
        assert_eq!(honest.mine("Honest").unwrap().index, 1);
    }

    #[test]
    fn job_sealed_off_ledger_commits_and_keeps_late_transactions() {
        let mut l = ledger();
        l.add_transaction("Alice", "Bob", whole(5), None).unwrap();

        let mut job = l.prepare_block("Miner");
        assert!(!job.block().is_sealed());
        assert_eq!(job.difficulty(), 2);
        l.add_transaction("Carol", "Dave", whole(7), None).unwrap();
        job.seal().unwrap();

        let block = l.commit_block(job).unwrap().clone();
        assert_eq!(block.index, 1);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0].sender, "Alice");
        assert_eq!(l.pending().len(), 1);
        assert_eq!(l.pending()[0].sender, "Carol");
        assert!(l.is_valid());
    }

    #[test]
    fn job_goes_stale_when_tip_moves() {
        let mut l = ledger();
        l.add_transaction("Alice", "Bob", whole(5), None).unwrap();

        let mut job = l.prepare_block("Slow");
        l.mine("Fast").unwrap();
        job.seal().unwrap();

        let err = l.commit_block(job).unwrap_err();
        assert!(matches!(err, LedgerError::StaleBlock { index: 1 }));
        assert_eq!(l.len(), 2);
        assert!(l.pending().is_empty());
    }

    #[test]
    fn unsealed_job_is_not_committed() {
        let mut l = ledger();
        let job = l.prepare_block("Lazy");
        let err = l.commit_block(job).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidChain(ChainError::HashMismatch { index: 1 })
        ));
        assert_eq!(l.len(), 1);
    }
}
