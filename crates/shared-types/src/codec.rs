//! # Canonical Encoding
//!
//! Every hash in the chain (signing payloads, header hashes, merkle leaves,
//! state roots) is keccak-256 over the `bincode` encoding of a struct.
//! `bincode` writes fields in declaration order with fixed-width integers, so
//! two nodes holding equal values always produce equal bytes.

use crate::entities::Hash;
use serde::Serialize;
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Encoding and integrity errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Canonical encoding failed.
    #[error("Canonical encoding failed: {0}")]
    Encoding(String),

    /// A stored hash does not match the recomputed one.
    #[error("Hash mismatch: stored {expected}, recomputed {actual}")]
    HashMismatch {
        /// Hash carried by the value.
        expected: String,
        /// Hash recomputed from content.
        actual: String,
    },
}

/// Canonical bytes of a value.
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encoding(e.to_string()))
}

/// keccak-256 of the canonical bytes of a value.
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> Result<Hash, CodecError> {
    Ok(keccak256(&canonical_bytes(value)?))
}

/// keccak-256.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex without prefix.
pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}
