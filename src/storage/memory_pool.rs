use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::utils::Hash;
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

// Fee values are validated finite at transaction construction, so
// `total_cmp` gives the usual numeric order.
#[derive(Debug, Clone, Copy)]
struct FeeKey(f64);

impl PartialEq for FeeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FeeKey {}

impl PartialOrd for FeeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FeeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// ( fee_base_price, insertion sequence )
type QueueKey = (FeeKey, u64);

#[derive(Default)]
struct PoolState {
    queue: BTreeMap<QueueKey, Transaction>,
    // txid -> queue key, for removal by identity
    index: HashMap<Hash, QueueKey>,
    // txid -> sequence of a transaction handed to the miner, so a requeued
    // transaction gets its original place among equal fees back
    taken: HashMap<Hash, u64>,
    next_seq: u64,
}

impl PoolState {
    fn insert(&mut self, tx: Transaction) -> bool {
        if self.index.contains_key(tx.get_id()) {
            return false;
        }
        let seq = match self.taken.remove(tx.get_id()) {
            Some(seq) => seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        let key = (FeeKey(tx.get_fee_base_price()), seq);
        self.index.insert(*tx.get_id(), key);
        self.queue.insert(key, tx);
        true
    }

    fn pop_first(&mut self) -> Option<Transaction> {
        let ((_, seq), tx) = self.queue.pop_first()?;
        self.index.remove(tx.get_id());
        self.taken.insert(*tx.get_id(), seq);
        Some(tx)
    }

    fn remove(&mut self, txid: &Hash) -> Option<Transaction> {
        self.taken.remove(txid);
        let key = self.index.remove(txid)?;
        self.queue.remove(&key)
    }
}

/// Pending transactions ordered by ascending `fee_base_price`; equal fees
/// leave in submission order.
pub struct PendingPool {
    inner: RwLock<PoolState>,
}

impl Default for PendingPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingPool {
    pub fn new() -> PendingPool {
        PendingPool {
            inner: RwLock::new(PoolState::default()),
        }
    }

    /// Submit a transaction. A transaction that is already pending is
    /// rejected.
    pub fn add(&self, tx: Transaction) -> Result<()> {
        let txid = tx.get_id_hex();
        match self.inner.write() {
            Ok(mut pool) => {
                if !pool.insert(tx) {
                    return Err(BlockchainError::InvalidField(format!(
                        "Transaction {txid} is already pending"
                    )));
                }
                info!("Adding transaction: {txid}");
                Ok(())
            }
            Err(_) => {
                log::error!("Failed to acquire write lock on pending pool");
                Err(BlockchainError::Lock("pending pool".to_string()))
            }
        }
    }

    /// Remove and return up to `capacity` transactions, lowest fee first.
    pub fn take_for_next_block(&self, capacity: usize) -> Vec<Transaction> {
        match self.inner.write() {
            Ok(mut pool) => {
                debug!("Length of pending transaction queue: {}", pool.queue.len());
                let mut next = Vec::with_capacity(capacity.min(pool.queue.len()));
                while next.len() < capacity {
                    let Some(tx) = pool.pop_first() else {
                        break;
                    };
                    next.push(tx);
                }
                next
            }
            Err(_) => {
                log::error!("Failed to acquire write lock on pending pool");
                Vec::new()
            }
        }
    }

    /// Put transactions back, e.g. from a discarded candidate block. A
    /// transaction taken from this pool keeps its original submission order.
    /// Transactions that are pending again already are skipped.
    pub fn requeue(&self, transactions: Vec<Transaction>) {
        match self.inner.write() {
            Ok(mut pool) => {
                for tx in transactions {
                    let txid = tx.get_id_hex();
                    if pool.insert(tx) {
                        debug!("Requeued transaction: {txid}");
                    } else {
                        warn!("Transaction {txid} was already pending, not requeued");
                    }
                }
            }
            Err(_) => {
                log::error!("Failed to acquire write lock on pending pool");
            }
        }
    }

    /// Remove a transaction by id, returning it if it was pending. Also
    /// forgets the submission order of a taken transaction.
    pub fn remove(&self, txid: &Hash) -> Option<Transaction> {
        match self.inner.write() {
            Ok(mut pool) => pool.remove(txid),
            Err(_) => {
                log::error!("Failed to acquire write lock on pending pool");
                None
            }
        }
    }

    pub fn get(&self, txid: &Hash) -> Option<Transaction> {
        match self.inner.read() {
            Ok(pool) => pool
                .index
                .get(txid)
                .and_then(|key| pool.queue.get(key))
                .cloned(),
            Err(_) => {
                log::error!("Failed to acquire read lock on pending pool");
                None
            }
        }
    }

    pub fn contains(&self, txid: &Hash) -> bool {
        match self.inner.read() {
            Ok(pool) => pool.index.contains_key(txid),
            Err(_) => {
                log::error!("Failed to acquire read lock on pending pool");
                false
            }
        }
    }

    /// Pending transactions in the order they would be taken
    pub fn snapshot(&self) -> Vec<Transaction> {
        match self.inner.read() {
            Ok(pool) => pool.queue.values().cloned().collect(),
            Err(_) => {
                log::error!("Failed to acquire read lock on pending pool");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(pool) => pool.queue.len(),
            Err(_) => {
                log::error!("Failed to acquire read lock on pending pool");
                0
            }
        }
    }

    /// Same as [`PendingPool::len`], named like [`crate::core::Chain::size`]
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        match self.inner.read() {
            Ok(pool) => pool.queue.is_empty(),
            Err(_) => {
                log::error!("Failed to acquire read lock on pending pool");
                true // Conservative default
            }
        }
    }

    pub fn clear(&self) {
        match self.inner.write() {
            Ok(mut pool) => {
                pool.queue.clear();
                pool.index.clear();
                pool.taken.clear();
            }
            Err(_) => {
                log::error!("Failed to acquire write lock on pending pool");
            }
        }
    }
}
