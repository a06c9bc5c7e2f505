//! Configuration management
//!
//! This module handles the settings of the ledger: network id, difficulty
//! target, block capacity, miner behaviour and where chains are persisted.
//! Defaults can be overridden from `LEDGER_*` environment variables or a
//! TOML file.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
