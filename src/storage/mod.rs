//! Data storage and persistence
//!
//! This module manages the pending-transaction pool and the JSON files a
//! chain is persisted to.

pub mod memory_pool;
pub mod persistence;

pub use memory_pool::PendingPool;
pub use persistence::{ChainStore, PersistenceListener};
