//! # Prov Ledger - Single-Node Proof-of-Work Ledger
//!
//! Accepts transactions into a fee-ordered pending pool, batches them into
//! candidate blocks, searches for a nonce whose header digest meets a
//! numeric difficulty target, and appends mined blocks to an in-memory,
//! hash-chained ledger.
//!
//! ## How the Code Is Organized
//! - `core/`: transactions, blocks and headers, the chain, the ledger and the
//!   difficulty target
//! - `storage/`: the pending-transaction pool and JSON chain persistence
//! - `mining/`: the background miner and block listeners
//! - `registry/`: the shared ledger and pool instances of a process
//! - `config/`: configuration from defaults, environment and TOML files
//! - `utils/`: hashing, canonical encoding and timestamps
//! - `cli/`: command-line interface of the demo binary
//!
//! There is exactly one ledger and one miner per registry. There is no
//! networking, fork resolution or signature checking.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod mining;
pub mod registry;
pub mod storage;
pub mod utils;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{Block, BlockHeader, Blockchain, Chain, Difficulty, Transaction};
pub use error::{BlockchainError, Result};
pub use mining::{BlockListener, Miner, MinerState, MiningResult};
pub use registry::Registry;
pub use storage::{ChainStore, PendingPool, PersistenceListener};
pub use utils::{current_timestamp, hash, sha256_digest, to_hex, Hash};
