use crate::error::{BlockchainError, Result};
use crate::utils::serialize;
use data_encoding::HEXLOWER;
use ring::digest::{Context, SHA256};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Length in bytes of every digest produced by [`hash`].
pub const HASH_LEN: usize = 32;

/// 32-byte SHA-256 digest used for block and transaction identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, bincode::Encode)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// The all-zero digest, used as the genesis previous hash
    pub const fn zero() -> Self {
        Hash([0u8; HASH_LEN])
    }

    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Hash(bytes)
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let bytes = HEXLOWER
            .decode(hex.as_bytes())
            .map_err(|e| BlockchainError::InvalidField(format!("Invalid hex digest: {e}")))?;
        let arr: [u8; HASH_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            BlockchainError::InvalidField(format!(
                "Digest must be {HASH_LEN} bytes, got {}",
                b.len()
            ))
        })?;
        Ok(Hash(arr))
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::zero()
    }
}

// Digests travel as lowercase hex in the JSON projection of a block.
impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Hash::from_hex(&hex).map_err(de::Error::custom)
    }
}

pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BlockchainError::InvalidField(format!("System time error: {e}")))?
        .as_millis();

    // Ensure the timestamp fits in i64
    if duration > i64::MAX as u128 {
        return Err(BlockchainError::InvalidField(
            "Timestamp overflow".to_string(),
        ));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> Hash {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(digest.as_ref());
    Hash(out)
}

/// Hash any encodable value through its canonical bincode encoding.
///
/// Two values that encode to the same bytes always share a digest, so every
/// type hashed here must keep its field order stable.
pub fn hash<T: bincode::Encode>(value: &T) -> Result<Hash> {
    let bytes = serialize(value)?;
    Ok(sha256_digest(&bytes))
}

pub fn to_hex(bytes: &[u8]) -> String {
    HEXLOWER.encode(bytes)
}
