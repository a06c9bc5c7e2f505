use crate::error::{BlockchainError, Result};
use crate::utils::{hash, Hash};
use serde::{Deserialize, Serialize};

pub const BLOCK_VERSION: u32 = 1;

/// First nonce tried for every candidate
pub const MIN_NONCE: u32 = 1;

/// Largest nonce a header may carry (`2^31 - 1`)
pub const MAX_NONCE: u32 = i32::MAX as u32;

/// Block metadata. The digest of the header is the identity of the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode)]
pub struct BlockHeader {
    version: u32,
    timestamp: i64,
    previous_hash: Hash,
    transaction_set_digest: Hash,
    nonce: u32,
}

impl BlockHeader {
    pub fn new(timestamp: i64, previous_hash: Hash, transaction_set_digest: Hash) -> BlockHeader {
        BlockHeader {
            version: BLOCK_VERSION,
            timestamp,
            previous_hash,
            transaction_set_digest,
            nonce: MIN_NONCE,
        }
    }

    pub fn hash(&self) -> Result<Hash> {
        hash(self)
    }

    /// Advance the nonce by one.
    ///
    /// Fails with [`BlockchainError::NonceExhausted`] once the nonce sits at
    /// [`MAX_NONCE`]; the header is left unchanged in that case.
    pub fn increment_nonce(&mut self) -> Result<()> {
        if self.nonce >= MAX_NONCE {
            return Err(BlockchainError::NonceExhausted);
        }
        self.nonce += 1;
        Ok(())
    }

    pub fn set_nonce(&mut self, nonce: u32) -> Result<()> {
        if !(MIN_NONCE..=MAX_NONCE).contains(&nonce) {
            return Err(BlockchainError::InvalidField(format!(
                "nonce must be within [{MIN_NONCE}, {MAX_NONCE}], got {nonce}"
            )));
        }
        self.nonce = nonce;
        Ok(())
    }

    pub fn reset_nonce(&mut self) {
        self.nonce = MIN_NONCE;
    }

    pub(crate) fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }

    pub(crate) fn set_transaction_set_digest(&mut self, digest: Hash) {
        self.transaction_set_digest = digest;
    }

    pub fn get_version(&self) -> u32 {
        self.version
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_previous_hash(&self) -> &Hash {
        &self.previous_hash
    }

    pub fn get_transaction_set_digest(&self) -> &Hash {
        &self.transaction_set_digest
    }

    pub fn get_nonce(&self) -> u32 {
        self.nonce
    }
}
