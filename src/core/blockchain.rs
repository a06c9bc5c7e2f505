// The ledger: one chain, one difficulty target, and lookup caches from block
// hash to block and from transaction id to transaction. The chain and both
// caches live behind a single lock so readers never see them out of step.

use crate::config::Config;
use crate::core::{Block, Chain, Difficulty, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::Hash;
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

struct LedgerState {
    chain: Chain,
    block_cache: HashMap<Hash, Block>,
    transaction_cache: HashMap<Hash, Transaction>,
}

pub struct Blockchain {
    inner: RwLock<LedgerState>,
    difficulty: Difficulty,
    network_id: u64,
}

impl Blockchain {
    pub fn new(network_id: u64, difficulty: Difficulty) -> Blockchain {
        debug!("Creating ledger for network {network_id} with difficulty {difficulty}");
        Blockchain {
            inner: RwLock::new(LedgerState {
                chain: Chain::new(network_id),
                block_cache: HashMap::new(),
                transaction_cache: HashMap::new(),
            }),
            difficulty,
            network_id,
        }
    }

    pub fn from_config(config: &Config) -> Blockchain {
        Self::new(config.network_id, config.difficulty.clone())
    }

    // A panic while holding the lock cannot leave the state half-written:
    // every mutation below happens after all fallible checks.
    fn state(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a block and update both caches in one step.
    ///
    /// The block must link to the current tail, commit to its transactions,
    /// carry no transaction twice or already on the chain, and meet the
    /// difficulty target. A rejected block leaves the ledger untouched.
    pub fn add_block(&self, block: Block) -> Result<Hash> {
        let block_hash = block.block_hash()?;
        let mut state = self.state_mut();

        let tail_hash = state.chain.last().block_hash()?;
        if *block.get_previous_hash() != tail_hash {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {block_hash} links to {} but the tail is {tail_hash}",
                block.get_previous_hash()
            )));
        }
        if !block.verify_transaction_set() {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {block_hash} does not match its transaction set digest"
            )));
        }
        let mut seen = HashSet::new();
        for transaction in block.get_transactions() {
            let txid = transaction.get_id();
            if !seen.insert(*txid) || state.transaction_cache.contains_key(txid) {
                return Err(BlockchainError::InvalidBlock(format!(
                    "block {block_hash} repeats transaction {txid}"
                )));
            }
        }
        if !self.fulfills_difficulty(&block_hash) {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {block_hash} does not meet difficulty {}",
                self.difficulty
            )));
        }

        for transaction in block.get_transactions() {
            state
                .transaction_cache
                .insert(*transaction.get_id(), transaction.clone());
        }
        state.block_cache.insert(block_hash, block.clone());
        state.chain.add(block);

        info!(
            "Appended block {block_hash} at height {}",
            state.chain.size() - 1
        );
        Ok(block_hash)
    }

    /// Inclusive comparison of the digest, read big-endian, against the target
    pub fn fulfills_difficulty(&self, digest: &Hash) -> bool {
        self.difficulty.is_met_by(digest)
    }

    pub fn get_previous_hash(&self) -> Result<Hash> {
        self.state().chain.last().block_hash()
    }

    pub fn get_latest_block(&self) -> Block {
        self.state().chain.last().clone()
    }

    /// Number of blocks, genesis included
    pub fn size(&self) -> usize {
        self.state().chain.size()
    }

    pub fn get_block(&self, index: usize) -> Option<Block> {
        self.state().chain.get(index).cloned()
    }

    pub fn get_block_by_hash(&self, block_hash: &Hash) -> Option<Block> {
        self.state().block_cache.get(block_hash).cloned()
    }

    pub fn get_transaction(&self, txid: &Hash) -> Option<Transaction> {
        self.state().transaction_cache.get(txid).cloned()
    }

    /// Deep copy of the chain; callers cannot reach the ledger's own blocks
    pub fn chain_snapshot(&self) -> Chain {
        self.state().chain.clone()
    }

    pub fn get_difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    pub fn network_id(&self) -> u64 {
        self.network_id
    }
}
