use crate::core::{BlockHeader, Transaction};
use crate::error::Result;
use crate::utils::{current_timestamp, sha256_digest, Hash};
use serde::{Deserialize, Serialize};

/// Timestamp of the fixed genesis block
pub const GENESIS_TIMESTAMP: i64 = 0;

/// An ordered batch of transactions bound to its header by the
/// transaction-set digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    transactions: Vec<Transaction>,
    transaction_count: usize,
    header: BlockHeader,
}

/// Digest of the concatenated transaction ids, in list order.
///
/// The ids are fixed-width, so the raw concatenation is hashed directly.
pub fn transaction_set_digest(transactions: &[Transaction]) -> Hash {
    let mut ids = Vec::with_capacity(transactions.len() * 32);
    for transaction in transactions {
        ids.extend_from_slice(transaction.get_id().as_bytes());
    }
    sha256_digest(ids.as_slice())
}

impl Block {
    /// Candidate block stamped with the current time and nonce 1
    pub fn new(transactions: Vec<Transaction>, previous_hash: Hash) -> Result<Block> {
        Ok(Self::with_timestamp(
            transactions,
            previous_hash,
            current_timestamp()?,
        ))
    }

    pub fn with_timestamp(
        transactions: Vec<Transaction>,
        previous_hash: Hash,
        timestamp: i64,
    ) -> Block {
        let digest = transaction_set_digest(&transactions);
        Block {
            transaction_count: transactions.len(),
            transactions,
            header: BlockHeader::new(timestamp, previous_hash, digest),
        }
    }

    /// The fixed first block of every chain: no transactions, all-zero
    /// previous hash.
    pub fn genesis() -> Block {
        Self::with_timestamp(Vec::new(), Hash::zero(), GENESIS_TIMESTAMP)
    }

    pub fn block_hash(&self) -> Result<Hash> {
        self.header.hash()
    }

    /// Lowercase hex of the block hash, used as the file key when persisting
    pub fn block_hash_hex(&self) -> Result<String> {
        Ok(self.block_hash()?.to_hex())
    }

    pub fn increment_nonce(&mut self) -> Result<()> {
        self.header.increment_nonce()
    }

    pub fn set_nonce(&mut self, nonce: u32) -> Result<()> {
        self.header.set_nonce(nonce)
    }

    pub fn add_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
        self.sync_transaction_set();
    }

    /// Swap in a fresh transaction set for a restarted search: the digest is
    /// recomputed, the timestamp refreshed and the nonce reset.
    ///
    /// Returns the transactions that were replaced.
    pub fn replace_transactions(
        &mut self,
        transactions: Vec<Transaction>,
        timestamp: i64,
    ) -> Vec<Transaction> {
        let previous = std::mem::replace(&mut self.transactions, transactions);
        self.sync_transaction_set();
        self.header.set_timestamp(timestamp);
        self.header.reset_nonce();
        previous
    }

    /// Give up ownership of the transactions, e.g. to return them to the pool
    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    pub(crate) fn stamp_block_id(&mut self, block_id: Hash) {
        for transaction in self.transactions.iter_mut() {
            transaction.set_block_id(block_id);
        }
    }

    fn sync_transaction_set(&mut self) {
        self.transaction_count = self.transactions.len();
        self.header
            .set_transaction_set_digest(transaction_set_digest(&self.transactions));
    }

    /// Check that the header still commits to exactly these transactions
    pub fn verify_transaction_set(&self) -> bool {
        self.transaction_count == self.transactions.len()
            && *self.header.get_transaction_set_digest()
                == transaction_set_digest(&self.transactions)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_transaction_count(&self) -> usize {
        self.transaction_count
    }

    pub fn get_header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn get_previous_hash(&self) -> &Hash {
        self.header.get_previous_hash()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.header.get_timestamp()
    }

    pub fn get_nonce(&self) -> u32 {
        self.header.get_nonce()
    }

    pub fn is_genesis(&self) -> bool {
        *self == Block::genesis()
    }

    /// Structured projection `{transactions, transaction_count, header}`
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MAX_NONCE;
    use crate::error::BlockchainError;

    fn tx(fee: f64) -> Transaction {
        Transaction::new(b"sender".to_vec(), b"receiver".to_vec(), 1.0, 1, fee, 1.0, None).unwrap()
    }

    #[test]
    fn test_new_block_commits_to_transactions() {
        let block = Block::new(vec![tx(1.0), tx(2.0)], Hash([5u8; 32])).unwrap();
        assert_eq!(block.get_transaction_count(), 2);
        assert_eq!(block.get_nonce(), 1);
        assert_eq!(block.get_previous_hash(), &Hash([5u8; 32]));
        assert!(block.verify_transaction_set());
    }

    #[test]
    fn test_digest_is_hash_of_concatenated_ids() {
        let txs = vec![tx(1.0), tx(2.0)];
        let mut concat = Vec::new();
        for t in &txs {
            concat.extend_from_slice(t.get_id().as_bytes());
        }
        let block = Block::with_timestamp(txs, Hash::zero(), 10);
        assert_eq!(
            block.get_header().get_transaction_set_digest(),
            &sha256_digest(&concat)
        );
    }

    #[test]
    fn test_digest_depends_on_order() {
        let a = Block::with_timestamp(vec![tx(1.0), tx(2.0)], Hash::zero(), 10);
        let b = Block::with_timestamp(vec![tx(2.0), tx(1.0)], Hash::zero(), 10);
        assert_ne!(
            a.get_header().get_transaction_set_digest(),
            b.get_header().get_transaction_set_digest()
        );
    }

    #[test]
    fn test_add_transaction_keeps_header_in_sync() {
        let mut block = Block::with_timestamp(vec![tx(1.0)], Hash::zero(), 10);
        let before = block.block_hash().unwrap();
        block.add_transaction(tx(2.0));

        assert_eq!(block.get_transaction_count(), 2);
        assert!(block.verify_transaction_set());
        assert_ne!(before, block.block_hash().unwrap());
    }

    #[test]
    fn test_replace_transactions_resets_search() {
        let mut block = Block::with_timestamp(vec![tx(1.0)], Hash::zero(), 10);
        block.set_nonce(MAX_NONCE).unwrap();
        assert_eq!(block.increment_nonce(), Err(BlockchainError::NonceExhausted));

        let old = block.replace_transactions(vec![tx(3.0), tx(4.0)], 20);
        assert_eq!(old, vec![tx(1.0)]);
        assert_eq!(block.get_nonce(), 1);
        assert_eq!(block.get_timestamp(), 20);
        assert_eq!(block.get_transaction_count(), 2);
        assert!(block.verify_transaction_set());
    }

    #[test]
    fn test_genesis_is_fixed() {
        let genesis = Block::genesis();
        assert!(genesis.get_transactions().is_empty());
        assert_eq!(genesis.get_previous_hash(), &Hash::zero());
        assert_eq!(
            genesis.block_hash().unwrap(),
            Block::genesis().block_hash().unwrap()
        );
        assert!(genesis.is_genesis());
    }

    #[test]
    fn test_stamp_block_id_leaves_hash_untouched() {
        let mut block = Block::with_timestamp(vec![tx(1.0)], Hash::zero(), 10);
        let hash = block.block_hash().unwrap();
        block.stamp_block_id(hash);
        assert_eq!(block.block_hash().unwrap(), hash);
        assert_eq!(block.get_transactions()[0].get_block_id(), Some(&hash));
    }

    #[test]
    fn test_json_projection_shape() {
        let block = Block::with_timestamp(vec![tx(1.0)], Hash::zero(), 10);
        let json = block.to_json().unwrap();
        assert_eq!(json["transaction_count"], 1);
        assert_eq!(json["header"]["version"], 1);
        assert_eq!(json["header"]["previous_hash"], Hash::zero().to_hex());
        assert_eq!(json["transactions"].as_array().unwrap().len(), 1);

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back.block_hash().unwrap(), block.block_hash().unwrap());
    }
}
