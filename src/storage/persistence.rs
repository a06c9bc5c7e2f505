// File-backed persistence: one pretty-printed JSON file per block, named by
// the hex block hash, grouped in a directory per network id.

use crate::config::Config;
use crate::core::{Block, Chain};
use crate::error::{BlockchainError, Result};
use crate::mining::BlockListener;
use crate::utils::Hash;
use log::{debug, error, info};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const BLOCK_FILE_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct ChainStore {
    root: PathBuf,
}

impl ChainStore {
    pub fn new(root: impl Into<PathBuf>) -> ChainStore {
        ChainStore { root: root.into() }
    }

    pub fn from_config(config: &Config) -> ChainStore {
        Self::new(config.chains_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chain_dir(&self, network_id: u64) -> PathBuf {
        self.root.join(network_id.to_string())
    }

    pub fn block_path(&self, network_id: u64, block_id: &str) -> PathBuf {
        self.chain_dir(network_id)
            .join(format!("{block_id}.{BLOCK_FILE_EXTENSION}"))
    }

    /// Write every block of `chain` that has no file yet. Returns how many
    /// files were written.
    pub fn write_chain(&self, chain: &Chain) -> Result<usize> {
        let mut written = 0;
        for block in chain.iter() {
            if self.write_block(chain.network_id(), block)? {
                written += 1;
            }
        }
        info!(
            "Persisted chain {} ({written} new of {} blocks)",
            chain.network_id(),
            chain.size()
        );
        Ok(written)
    }

    /// Write one block unless its file already exists. Returns whether a
    /// file was written.
    pub fn write_block(&self, network_id: u64, block: &Block) -> Result<bool> {
        let dir = self.chain_dir(network_id);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            debug!("Created chain directory {}", dir.display());
        }

        let block_id = block.block_hash_hex()?;
        let path = self.block_path(network_id, &block_id);
        if path.exists() {
            return Ok(false);
        }

        let json = serde_json::to_string_pretty(&block.to_json()?)?;
        fs::write(&path, json)?;
        debug!("Wrote block {block_id} to {}", path.display());
        Ok(true)
    }

    /// Load a persisted chain, ordering blocks by previous-hash linkage from
    /// genesis. A missing directory yields a chain holding only genesis.
    pub fn read_chain(&self, network_id: u64) -> Result<Chain> {
        let mut chain = Chain::new(network_id);
        let dir = self.chain_dir(network_id);
        if !dir.exists() {
            return Ok(chain);
        }

        // previous hash -> (block hash, block)
        let mut by_previous: HashMap<Hash, (Hash, Block)> = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BLOCK_FILE_EXTENSION) {
                continue;
            }
            let (block_hash, block) = Self::read_block(&path)?;
            if block.is_genesis() {
                continue;
            }
            let previous = *block.get_previous_hash();
            if by_previous.insert(previous, (block_hash, block)).is_some() {
                return Err(BlockchainError::Persistence(format!(
                    "two persisted blocks link to {previous}"
                )));
            }
        }

        let mut tail = chain.last().block_hash()?;
        while let Some((block_hash, block)) = by_previous.remove(&tail) {
            chain.add(block);
            tail = block_hash;
        }
        if !by_previous.is_empty() {
            return Err(BlockchainError::Persistence(format!(
                "{} persisted blocks do not link back to genesis",
                by_previous.len()
            )));
        }

        info!("Loaded chain {network_id} with {} blocks", chain.size());
        Ok(chain)
    }

    fn read_block(path: &Path) -> Result<(Hash, Block)> {
        let text = fs::read_to_string(path)?;
        let mut block: Block = serde_json::from_str(&text).map_err(|e| {
            BlockchainError::Persistence(format!("{}: {e}", path.display()))
        })?;

        if !block.verify_transaction_set() {
            return Err(BlockchainError::Persistence(format!(
                "{}: transaction set digest mismatch",
                path.display()
            )));
        }
        let block_hash = block.block_hash()?;
        let expected = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if block_hash.to_hex() != expected {
            return Err(BlockchainError::Persistence(format!(
                "{}: content hashes to {block_hash}",
                path.display()
            )));
        }

        block.stamp_block_id(block_hash);
        Ok((block_hash, block))
    }
}

/// Writes each newly mined block to a [`ChainStore`]
pub struct PersistenceListener {
    store: ChainStore,
    network_id: u64,
}

impl PersistenceListener {
    pub fn new(store: ChainStore, network_id: u64) -> PersistenceListener {
        PersistenceListener { store, network_id }
    }
}

impl BlockListener for PersistenceListener {
    fn notify_new_block(&self, block: &Block) {
        if let Err(e) = self.store.write_block(self.network_id, block) {
            error!("Failed to persist block: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Blockchain, Difficulty, Transaction};
    use tempfile::tempdir;

    fn ledger_with_blocks(count: usize) -> Blockchain {
        let ledger = Blockchain::new(3, Difficulty::easiest());
        for i in 0..count {
            let tx = Transaction::new(
                format!("sender{i}").into_bytes(),
                b"receiver".to_vec(),
                i as f64,
                i as u64,
                0.5,
                1.0,
                Some(format!("tag{i}")),
            )
            .unwrap();
            let mut block = Block::new(vec![tx], ledger.get_previous_hash().unwrap()).unwrap();
            let hash = block.block_hash().unwrap();
            block.stamp_block_id(hash);
            ledger.add_block(block).unwrap();
        }
        ledger
    }

    #[test]
    fn test_write_and_read_chain() {
        let dir = tempdir().unwrap();
        let store = ChainStore::new(dir.path());
        let chain = ledger_with_blocks(3).chain_snapshot();

        assert_eq!(store.write_chain(&chain).unwrap(), 4);
        // Existing files are not rewritten
        assert_eq!(store.write_chain(&chain).unwrap(), 0);

        let loaded = store.read_chain(3).unwrap();
        assert_eq!(loaded, chain);
        let last = loaded.last();
        assert_eq!(
            last.get_transactions()[0].get_block_id(),
            Some(&last.block_hash().unwrap())
        );
    }

    #[test]
    fn test_reload_keeps_exact_float_values() {
        let dir = tempdir().unwrap();
        let store = ChainStore::new(dir.path());
        let ledger = Blockchain::new(5, Difficulty::easiest());
        let values = [
            (1.1, 0.10000010000000001),
            (12.100000000000001, 0.30000000000000004),
            (3.3000000000000003, 2.0000001),
        ];
        for (i, (amount, fee)) in values.into_iter().enumerate() {
            let tx = Transaction::new(
                b"sender".to_vec(),
                b"receiver".to_vec(),
                amount,
                i as u64,
                fee,
                fee * 3.0,
                None,
            )
            .unwrap();
            let mut block = Block::new(vec![tx], ledger.get_previous_hash().unwrap()).unwrap();
            let hash = block.block_hash().unwrap();
            block.stamp_block_id(hash);
            ledger.add_block(block).unwrap();
        }

        let chain = ledger.chain_snapshot();
        store.write_chain(&chain).unwrap();
        let loaded = store.read_chain(5).unwrap();
        assert_eq!(loaded, chain);

        let fees: Vec<f64> = loaded
            .iter()
            .skip(1)
            .map(|b| b.get_transactions()[0].get_fee_base_price())
            .collect();
        assert_eq!(fees, vec![0.10000010000000001, 0.30000000000000004, 2.0000001]);
        assert_eq!(
            loaded.get(2).unwrap().get_transactions()[0].get_amount(),
            12.100000000000001
        );
    }

    #[test]
    fn test_block_file_named_by_hash() {
        let dir = tempdir().unwrap();
        let store = ChainStore::new(dir.path());
        let chain = ledger_with_blocks(1).chain_snapshot();
        store.write_chain(&chain).unwrap();

        let hex = chain.last().block_hash_hex().unwrap();
        assert!(store.block_path(3, &hex).exists());
        assert!(dir.path().join("3").join(format!("{hex}.json")).exists());
    }

    #[test]
    fn test_read_missing_chain_is_genesis_only() {
        let dir = tempdir().unwrap();
        let store = ChainStore::new(dir.path());
        let chain = store.read_chain(42).unwrap();
        assert_eq!(chain.size(), 1);
        assert_eq!(chain.network_id(), 42);
    }

    #[test]
    fn test_read_rejects_tampered_block() {
        let dir = tempdir().unwrap();
        let store = ChainStore::new(dir.path());
        let chain = ledger_with_blocks(1).chain_snapshot();
        store.write_chain(&chain).unwrap();

        let hex = chain.last().block_hash_hex().unwrap();
        let path = store.block_path(3, &hex);
        let mut json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        json["header"]["nonce"] = serde_json::json!(99);
        fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(
            store.read_chain(3),
            Err(BlockchainError::Persistence(_))
        ));
    }

    #[test]
    fn test_read_rejects_orphan_block() {
        let dir = tempdir().unwrap();
        let store = ChainStore::new(dir.path());
        let orphan = Block::with_timestamp(Vec::new(), Hash([1u8; 32]), 5);
        store.write_block(3, &orphan).unwrap();

        assert!(matches!(
            store.read_chain(3),
            Err(BlockchainError::Persistence(_))
        ));
    }

    #[test]
    fn test_listener_writes_block() {
        let dir = tempdir().unwrap();
        let store = ChainStore::new(dir.path());
        let listener = PersistenceListener::new(store.clone(), 3);
        let block = ledger_with_blocks(1).get_latest_block();

        listener.notify_new_block(&block);
        assert!(store
            .block_path(3, &block.block_hash_hex().unwrap())
            .exists());
    }
}
