use crate::error::{BlockchainError, Result};
use crate::utils::{Hash, HASH_LEN};
use num_bigint::BigUint;
use std::fmt;
use std::str::FromStr;

/// Threshold used by the ledger before `LEDGER_DIFFICULTY` or a config file
/// says otherwise. Roughly one digest in 2^21 meets it.
pub const DEFAULT_DIFFICULTY: &str =
    "57896000000000000000000000000000000000000000000000000000000000000000000";

const DIGEST_BITS: u32 = (HASH_LEN * 8) as u32;

/// Numeric proof-of-work target.
///
/// A digest, read as an unsigned big-endian integer, meets the target when it
/// is less than or equal to the threshold. The comparison is inclusive.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Difficulty {
    threshold: BigUint,
}

impl Difficulty {
    pub fn new(threshold: BigUint) -> Difficulty {
        Difficulty { threshold }
    }

    pub fn from_decimal_str(value: &str) -> Result<Difficulty> {
        let threshold = BigUint::parse_bytes(value.trim().as_bytes(), 10).ok_or_else(|| {
            BlockchainError::InvalidField(format!("Difficulty is not a decimal integer: {value}"))
        })?;
        Ok(Difficulty { threshold })
    }

    /// Target that requires `bits` leading zero bits: `2^(256 - bits) - 1`.
    pub fn from_leading_zero_bits(bits: u32) -> Result<Difficulty> {
        if bits > DIGEST_BITS {
            return Err(BlockchainError::InvalidField(format!(
                "Difficulty bits must be at most {DIGEST_BITS}, got {bits}"
            )));
        }
        Ok(Difficulty {
            threshold: max_below_power_of_two(DIGEST_BITS - bits),
        })
    }

    /// Accepts every digest
    pub fn easiest() -> Difficulty {
        Difficulty {
            threshold: max_below_power_of_two(DIGEST_BITS),
        }
    }

    /// Accepts only the all-zero digest
    pub fn impossible() -> Difficulty {
        Difficulty {
            threshold: BigUint::from(0u8),
        }
    }

    pub fn threshold(&self) -> &BigUint {
        &self.threshold
    }

    pub fn is_met_by(&self, digest: &Hash) -> bool {
        digest_value(digest) <= self.threshold
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::from_decimal_str(DEFAULT_DIFFICULTY).unwrap_or_else(|_| Difficulty::easiest())
    }
}

impl FromStr for Difficulty {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self> {
        Difficulty::from_decimal_str(s)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.threshold)
    }
}

impl fmt::Debug for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Difficulty({})", self.threshold)
    }
}

/// Interpret a digest as an unsigned big-endian integer
pub fn digest_value(digest: &Hash) -> BigUint {
    BigUint::from_bytes_be(digest.as_bytes())
}

// 2^bits - 1
fn max_below_power_of_two(bits: u32) -> BigUint {
    (BigUint::from(1u8) << bits as usize) - BigUint::from(1u8)
}
