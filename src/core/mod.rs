//! Core ledger functionality
//!
//! This module contains the fundamental ledger components including
//! transactions, blocks and headers, the chain, the ledger itself and the
//! proof-of-work difficulty target.

pub mod block;
pub mod block_header;
pub mod blockchain;
pub mod chain;
pub mod proof_of_work;
pub mod transaction;

pub use block::{transaction_set_digest, Block, GENESIS_TIMESTAMP};
pub use block_header::{BlockHeader, BLOCK_VERSION, MAX_NONCE, MIN_NONCE};
pub use blockchain::Blockchain;
pub use chain::Chain;
pub use proof_of_work::{Difficulty, DEFAULT_DIFFICULTY};
pub use transaction::Transaction;
