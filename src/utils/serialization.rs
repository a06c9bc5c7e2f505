// Canonical encoding used for every digest in the ledger: bincode 2 with the
// standard configuration (declaration-order fields, varint integers,
// little-endian floats, length-prefixed byte strings).
use crate::error::{BlockchainError, Result};

/// Canonical bytes of `value`, the input to every ledger digest
pub fn serialize<T: bincode::Encode>(value: &T) -> Result<Vec<u8>> {
    bincode::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| BlockchainError::Serialization(format!("cannot encode value: {e}")))
}
