//! Error handling for the ledger
//!
//! This module provides the error types shared by every ledger operation.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error types for ledger operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// A value could not be encoded for hashing
    Serialization(String),
    /// The block header nonce reached its maximum value
    NonceExhausted,
    /// A constructor or setter received a value it must not store
    InvalidField(String),
    /// The ledger refused to append a block
    InvalidBlock(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
    /// Persisted chain files are missing or inconsistent
    Persistence(String),
    /// Mining worker errors
    Mining(String),
    /// A shared structure's lock was poisoned
    Lock(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::NonceExhausted => write!(f, "Nonce exhausted"),
            BlockchainError::InvalidField(msg) => write!(f, "Invalid field: {msg}"),
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Persistence(msg) => write!(f, "Persistence error: {msg}"),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::Lock(msg) => write!(f, "Lock error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(BlockchainError::NonceExhausted.to_string(), "Nonce exhausted");
        assert_eq!(
            BlockchainError::InvalidField("amount".to_string()).to_string(),
            "Invalid field: amount"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BlockchainError = io.into();
        assert!(matches!(err, BlockchainError::Io(msg) if msg.contains("missing")));
    }
}
