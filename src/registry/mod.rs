//! Dependency registry
//!
//! A `Registry` hands out the single ledger and the single pending pool of a
//! process. Both are created on first access from the registry's config and
//! can be swapped for other instances with the `inject_*` methods, which is
//! how tests run the miner against prepared state.
//!
//! Components receive the registry explicitly; [`Registry::global`] exists
//! for callers that want one shared instance for the whole process.

use crate::config::{Config, GLOBAL_CONFIG};
use crate::core::Blockchain;
use crate::storage::PendingPool;
use log::info;
use once_cell::sync::Lazy;
use std::sync::{Arc, PoisonError, RwLock};

static GLOBAL_REGISTRY: Lazy<Arc<Registry>> =
    Lazy::new(|| Arc::new(Registry::new(GLOBAL_CONFIG.clone())));

pub struct Registry {
    config: Config,
    blockchain: RwLock<Option<Arc<Blockchain>>>,
    pending_pool: RwLock<Option<Arc<PendingPool>>>,
}

impl Registry {
    pub fn new(config: Config) -> Registry {
        Registry {
            config,
            blockchain: RwLock::new(None),
            pending_pool: RwLock::new(None),
        }
    }

    /// Process-wide registry built from [`GLOBAL_CONFIG`]
    pub fn global() -> Arc<Registry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The ledger, created on first access
    pub fn get_blockchain(&self) -> Arc<Blockchain> {
        if let Some(existing) = self
            .blockchain
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Arc::clone(existing);
        }

        let mut slot = self
            .blockchain
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let blockchain = slot.get_or_insert_with(|| {
            info!("Creating ledger for network {}", self.config.network_id);
            Arc::new(Blockchain::from_config(&self.config))
        });
        Arc::clone(blockchain)
    }

    pub fn inject_blockchain(&self, blockchain: Arc<Blockchain>) {
        info!("Injecting ledger for network {}", blockchain.network_id());
        *self
            .blockchain
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(blockchain);
    }

    /// The pending pool, created on first access
    pub fn get_pending_pool(&self) -> Arc<PendingPool> {
        if let Some(existing) = self
            .pending_pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Arc::clone(existing);
        }

        let mut slot = self
            .pending_pool
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let pool = slot.get_or_insert_with(|| {
            info!("Creating pending transaction pool");
            Arc::new(PendingPool::new())
        });
        Arc::clone(pool)
    }

    pub fn inject_pending_pool(&self, pending_pool: Arc<PendingPool>) {
        info!("Injecting pending transaction pool");
        *self
            .pending_pool
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(pending_pool);
    }
}
