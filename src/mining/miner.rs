// Background proof-of-work miner.
//
// Each round pulls a batch from the pending pool and the tail hash from the
// ledger, searches for a nonce whose header digest meets the difficulty, and
// commits the block. The stop flag is only checked between rounds; the
// cancel flag is checked before every hash inside the search.

use crate::core::{Block, Blockchain, Transaction};
use crate::error::{BlockchainError, Result};
use crate::registry::Registry;
use crate::storage::PendingPool;
use crate::utils::{current_timestamp, Hash};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Receives every block the miner commits, on the miner's own thread.
/// Implementations must return promptly or they stall the next round.
pub trait BlockListener: Send + Sync {
    fn notify_new_block(&self, block: &Block);
}

impl<F> BlockListener for F
where
    F: Fn(&Block) + Send + Sync,
{
    fn notify_new_block(&self, block: &Block) {
        self(block)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinerState {
    Idle,
    Assembling,
    Searching,
    Committing,
    Stopped,
}

impl MinerState {
    fn as_u8(self) -> u8 {
        match self {
            MinerState::Idle => 0,
            MinerState::Assembling => 1,
            MinerState::Searching => 2,
            MinerState::Committing => 3,
            MinerState::Stopped => 4,
        }
    }

    fn from_u8(value: u8) -> MinerState {
        match value {
            0 => MinerState::Idle,
            1 => MinerState::Assembling,
            2 => MinerState::Searching,
            3 => MinerState::Committing,
            _ => MinerState::Stopped,
        }
    }
}

/// Outcome of a single mining round
#[derive(Debug)]
pub enum MiningResult {
    /// The block was appended to the ledger
    Mined(Block),
    /// The cancel flag was raised during the search
    Cancelled,
    /// The pool was empty and empty blocks are disabled
    NoWork,
    /// The ledger refused the finished block
    Rejected(String),
}

enum SearchOutcome {
    Found(Hash),
    Cancelled,
}

pub struct Miner {
    registry: Arc<Registry>,
    listeners: RwLock<Vec<Arc<dyn BlockListener>>>,
    mining: AtomicBool,
    cancel_block: AtomicBool,
    state: AtomicU8,
    blocks_mined: AtomicU64,
    restarts: AtomicU64,
}

impl Miner {
    pub fn new(registry: Arc<Registry>) -> Miner {
        Miner {
            registry,
            listeners: RwLock::new(Vec::new()),
            mining: AtomicBool::new(true),
            cancel_block: AtomicBool::new(false),
            state: AtomicU8::new(MinerState::Idle.as_u8()),
            blocks_mined: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
        }
    }

    /// Run [`Miner::run`] on a dedicated thread named `miner`.
    pub fn spawn(self: &Arc<Self>) -> Result<JoinHandle<Result<()>>> {
        self.mining.store(true, Ordering::SeqCst);
        let miner = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("miner".to_string())
            .spawn(move || miner.run())
            .map_err(|e| BlockchainError::Mining(format!("Failed to start miner thread: {e}")))?;
        Ok(handle)
    }

    /// Mine rounds until [`Miner::stop_mining`] is called.
    ///
    /// Returns an error only if hashing fails; nonce exhaustion is handled
    /// inside the round.
    pub fn run(&self) -> Result<()> {
        info!("Miner started!");
        let idle_poll = Duration::from_millis(self.registry.config().idle_poll_ms);

        while self.is_mining() {
            match self.mine_round() {
                Ok(MiningResult::NoWork) => thread::sleep(idle_poll),
                Ok(_) => {}
                Err(e) => {
                    error!("Miner stopped after error: {e}");
                    self.set_state(MinerState::Stopped);
                    return Err(e);
                }
            }
        }

        self.set_state(MinerState::Stopped);
        info!("Miner stopped.");
        Ok(())
    }

    /// Run exactly one round: assemble, search, commit.
    pub fn mine_round(&self) -> Result<MiningResult> {
        let config = self.registry.config();
        let pool = self.registry.get_pending_pool();
        let blockchain = self.registry.get_blockchain();

        self.set_state(MinerState::Assembling);
        let transactions = self.take_batch(&pool, &blockchain);
        if transactions.is_empty() && !config.mine_empty_blocks {
            self.set_state(MinerState::Idle);
            return Ok(MiningResult::NoWork);
        }

        let previous_hash = match blockchain.get_previous_hash() {
            Ok(hash) => hash,
            Err(e) => {
                pool.requeue(transactions);
                return Err(e);
            }
        };
        let mut candidate = Block::new(transactions, previous_hash)?;
        debug!(
            "Assembled candidate with {} transactions on top of {previous_hash}",
            candidate.get_transaction_count()
        );

        self.set_state(MinerState::Searching);
        let result = match self.search(&mut candidate, &blockchain, &pool)? {
            SearchOutcome::Cancelled => {
                self.discard(candidate, &pool);
                MiningResult::Cancelled
            }
            SearchOutcome::Found(block_hash) => {
                self.commit(candidate, block_hash, &blockchain, &pool)?
            }
        };

        self.set_state(if self.is_mining() {
            MinerState::Assembling
        } else {
            MinerState::Stopped
        });
        Ok(result)
    }

    fn search(
        &self,
        candidate: &mut Block,
        blockchain: &Blockchain,
        pool: &PendingPool,
    ) -> Result<SearchOutcome> {
        loop {
            if self.cancel_block.swap(false, Ordering::SeqCst) {
                return Ok(SearchOutcome::Cancelled);
            }

            let digest = candidate.block_hash()?;
            if blockchain.fulfills_difficulty(&digest) {
                return Ok(SearchOutcome::Found(digest));
            }

            match candidate.increment_nonce() {
                Ok(()) => {}
                Err(BlockchainError::NonceExhausted) => {
                    self.restart(candidate, blockchain, pool)?
                }
                Err(e) => return Err(e),
            }
        }
    }

    // Nonce space exhausted: hand the candidate's transactions back, pull a
    // fresh batch and search again under a newer timestamp.
    fn restart(
        &self,
        candidate: &mut Block,
        blockchain: &Blockchain,
        pool: &PendingPool,
    ) -> Result<()> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        info!("Restarting mining. Nonce exhausted");

        let timestamp = current_timestamp()?.max(candidate.get_timestamp() + 1);
        let previous = candidate.replace_transactions(Vec::new(), timestamp);
        pool.requeue(previous);
        let fresh = self.take_batch(pool, blockchain);
        candidate.replace_transactions(fresh, timestamp);
        Ok(())
    }

    // Pull the next batch, leaving out transactions the ledger already holds.
    fn take_batch(&self, pool: &PendingPool, blockchain: &Blockchain) -> Vec<Transaction> {
        let mut batch = pool.take_for_next_block(self.registry.config().block_capacity);
        batch.retain(|tx| {
            if blockchain.get_transaction(tx.get_id()).is_none() {
                return true;
            }
            warn!("Skipping transaction {}: already committed", tx.get_id_hex());
            pool.remove(tx.get_id());
            false
        });
        batch
    }

    fn discard(&self, candidate: Block, pool: &PendingPool) {
        if self.registry.config().requeue_cancelled {
            info!(
                "Block cancelled, returning {} transactions to the pool",
                candidate.get_transaction_count()
            );
            pool.requeue(candidate.into_transactions());
        } else {
            warn!(
                "Block cancelled, dropping {} transactions",
                candidate.get_transaction_count()
            );
            for transaction in candidate.get_transactions() {
                pool.remove(transaction.get_id());
            }
        }
    }

    fn commit(
        &self,
        candidate: Block,
        block_hash: Hash,
        blockchain: &Blockchain,
        pool: &PendingPool,
    ) -> Result<MiningResult> {
        self.set_state(MinerState::Committing);

        let mut block = candidate.clone();
        block.stamp_block_id(block_hash);
        for transaction in block.get_transactions() {
            info!("{}; {block_hash}", transaction.get_id_hex());
        }

        match blockchain.add_block(block.clone()) {
            Ok(_) => {}
            Err(BlockchainError::InvalidBlock(reason)) => {
                warn!("Ledger rejected mined block: {reason}");
                pool.requeue(candidate.into_transactions());
                return Ok(MiningResult::Rejected(reason));
            }
            Err(e) => return Err(e),
        }

        for transaction in block.get_transactions() {
            pool.remove(transaction.get_id());
        }
        self.blocks_mined.fetch_add(1, Ordering::SeqCst);
        info!("Block mined! {block_hash}");

        let listeners: Vec<Arc<dyn BlockListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.notify_new_block(&block);
        }

        Ok(MiningResult::Mined(block))
    }

    pub fn register_listener(&self, listener: impl BlockListener + 'static) {
        self.register_shared_listener(Arc::new(listener));
    }

    pub fn register_shared_listener(&self, listener: Arc<dyn BlockListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn is_mining(&self) -> bool {
        self.mining.load(Ordering::SeqCst)
    }

    /// Ask the worker to finish after the current round
    pub fn stop_mining(&self) {
        info!("Stopping mining.");
        self.mining.store(false, Ordering::SeqCst);
    }

    /// Abandon the candidate currently being searched
    pub fn set_cancel_block(&self) {
        info!("Canceling block.");
        self.cancel_block.store(true, Ordering::SeqCst);
    }

    pub fn state(&self) -> MinerState {
        MinerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: MinerState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::SeqCst)
    }

    /// How many times a search ran out of nonces and restarted
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::SeqCst)
    }
}
