//! Utility functions and helpers
//!
//! This module contains the hashing utility, the canonical encoding used
//! for digests, and timestamp helpers used throughout the ledger.

pub mod crypto;
pub mod serialization;

pub use crypto::{current_timestamp, hash, sha256_digest, to_hex, Hash, HASH_LEN};

pub use serialization::serialize;
