//! Proof-of-work mining
//!
//! The miner runs on its own thread, turning pending transactions into
//! blocks and announcing each committed block to registered listeners.

pub mod miner;

pub use miner::{BlockListener, Miner, MinerState, MiningResult};
