use crate::core::Difficulty;
use crate::error::{BlockchainError, Result};
use log::warn;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

static DEFAULT_CHAINS_DIR: &str = "chains";

const DEFAULT_NETWORK_ID: u64 = 1;
const DEFAULT_BLOCK_CAPACITY: usize = 1;
const DEFAULT_IDLE_POLL_MS: u64 = 50;

const NETWORK_ID_KEY: &str = "LEDGER_NETWORK_ID";
const DIFFICULTY_KEY: &str = "LEDGER_DIFFICULTY";
const DIFFICULTY_BITS_KEY: &str = "LEDGER_DIFFICULTY_BITS";
const BLOCK_CAPACITY_KEY: &str = "LEDGER_BLOCK_CAPACITY";
const CHAINS_DIR_KEY: &str = "LEDGER_CHAINS_DIR";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Tag of the single chain this process maintains
    pub network_id: u64,
    pub difficulty: Difficulty,
    /// Most transactions the miner pulls into one candidate block
    pub block_capacity: usize,
    /// Return the transactions of a cancelled candidate to the pending pool
    pub requeue_cancelled: bool,
    /// Keep mining blocks without transactions while the pool is empty
    pub mine_empty_blocks: bool,
    pub idle_poll_ms: u64,
    /// Root directory of persisted chains, one subdirectory per network id
    pub chains_dir: PathBuf,
}

// On-disk shape of a config file; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    network_id: Option<u64>,
    difficulty: Option<String>,
    difficulty_bits: Option<u32>,
    block_capacity: Option<usize>,
    requeue_cancelled: Option<bool>,
    mine_empty_blocks: Option<bool>,
    idle_poll_ms: Option<u64>,
    chains_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            network_id: DEFAULT_NETWORK_ID,
            difficulty: Difficulty::default(),
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            requeue_cancelled: true,
            mine_empty_blocks: false,
            idle_poll_ms: DEFAULT_IDLE_POLL_MS,
            chains_dir: PathBuf::from(DEFAULT_CHAINS_DIR),
        }
    }
}

impl Config {
    /// Defaults overridden by `LEDGER_*` environment variables
    pub fn new() -> Config {
        let mut config = Config::default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut config = Config::default();

        if let Some(network_id) = file.network_id {
            config.network_id = network_id;
        }
        match (file.difficulty, file.difficulty_bits) {
            (Some(_), Some(_)) => {
                return Err(BlockchainError::Config(
                    "Set either difficulty or difficulty_bits, not both".to_string(),
                ))
            }
            (Some(decimal), None) => {
                config.difficulty = Difficulty::from_decimal_str(&decimal)
                    .map_err(|e| BlockchainError::Config(e.to_string()))?;
            }
            (None, Some(bits)) => {
                config.difficulty = Difficulty::from_leading_zero_bits(bits)
                    .map_err(|e| BlockchainError::Config(e.to_string()))?;
            }
            (None, None) => {}
        }
        if let Some(capacity) = file.block_capacity {
            config.block_capacity = capacity;
        }
        if let Some(requeue) = file.requeue_cancelled {
            config.requeue_cancelled = requeue;
        }
        if let Some(mine_empty) = file.mine_empty_blocks {
            config.mine_empty_blocks = mine_empty;
        }
        if let Some(poll) = file.idle_poll_ms {
            config.idle_poll_ms = poll;
        }
        if let Some(dir) = file.chains_dir {
            config.chains_dir = dir;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_capacity == 0 {
            return Err(BlockchainError::Config(
                "block_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `LEDGER_*` overrides from `lookup`. Values that do not parse are
    /// logged and skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(NETWORK_ID_KEY) {
            match value.parse() {
                Ok(id) => self.network_id = id,
                Err(e) => warn!("Ignoring {NETWORK_ID_KEY}={value}: {e}"),
            }
        }
        if let Some(value) = lookup(DIFFICULTY_KEY) {
            match Difficulty::from_decimal_str(&value) {
                Ok(difficulty) => self.difficulty = difficulty,
                Err(e) => warn!("Ignoring {DIFFICULTY_KEY}: {e}"),
            }
        }
        if let Some(value) = lookup(DIFFICULTY_BITS_KEY) {
            match value
                .parse::<u32>()
                .map_err(|e| e.to_string())
                .and_then(|bits| Difficulty::from_leading_zero_bits(bits).map_err(|e| e.to_string()))
            {
                Ok(difficulty) => self.difficulty = difficulty,
                Err(e) => warn!("Ignoring {DIFFICULTY_BITS_KEY}={value}: {e}"),
            }
        }
        if let Some(value) = lookup(BLOCK_CAPACITY_KEY) {
            match value.parse::<usize>() {
                Ok(capacity) if capacity > 0 => self.block_capacity = capacity,
                Ok(_) => warn!("Ignoring {BLOCK_CAPACITY_KEY}=0"),
                Err(e) => warn!("Ignoring {BLOCK_CAPACITY_KEY}={value}: {e}"),
            }
        }
        if let Some(value) = lookup(CHAINS_DIR_KEY) {
            self.chains_dir = PathBuf::from(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.network_id, 1);
        assert_eq!(config.block_capacity, 1);
        assert!(config.requeue_cancelled);
        assert!(!config.mine_empty_blocks);
        assert_eq!(config.difficulty, Difficulty::default());
        assert_eq!(config.chains_dir, PathBuf::from("chains"));
    }

    #[test]
    fn test_from_toml_str() {
        let config = Config::from_toml_str(
            r#"
            network_id = 9
            difficulty_bits = 4
            block_capacity = 3
            requeue_cancelled = false
            chains_dir = "/tmp/ledger"
            "#,
        )
        .unwrap();

        assert_eq!(config.network_id, 9);
        assert_eq!(
            config.difficulty,
            Difficulty::from_leading_zero_bits(4).unwrap()
        );
        assert_eq!(config.block_capacity, 3);
        assert!(!config.requeue_cancelled);
        assert_eq!(config.chains_dir, PathBuf::from("/tmp/ledger"));
    }

    #[test]
    fn test_from_toml_str_rejects_bad_values() {
        assert!(Config::from_toml_str("block_capacity = 0").is_err());
        assert!(Config::from_toml_str("unknown_key = 1").is_err());
        assert!(Config::from_toml_str("difficulty = \"abc\"").is_err());
        assert!(Config::from_toml_str("difficulty = \"10\"\ndifficulty_bits = 2").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        std::fs::write(&path, "difficulty = \"1000\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.difficulty.to_string(), "1000");
        assert!(Config::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LEDGER_NETWORK_ID", "5"),
            ("LEDGER_DIFFICULTY_BITS", "2"),
            ("LEDGER_BLOCK_CAPACITY", "0"),
            ("LEDGER_CHAINS_DIR", "out"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.network_id, 5);
        assert_eq!(
            config.difficulty,
            Difficulty::from_leading_zero_bits(2).unwrap()
        );
        // zero capacity is ignored
        assert_eq!(config.block_capacity, 1);
        assert_eq!(config.chains_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "LEDGER_NETWORK_ID" => Some("not-a-number".to_string()),
            "LEDGER_DIFFICULTY" => Some("-1".to_string()),
            _ => None,
        });
        assert_eq!(config, Config::default());
    }
}
