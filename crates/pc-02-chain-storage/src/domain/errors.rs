//! # Domain Errors
//!
//! Error types for the chain storage layer.

use shared_types::CodecError;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// A row the caller required does not exist.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// Table name.
        kind: &'static str,
        /// Lookup key, rendered.
        key: String,
    },

    /// An insert collided with an existing row.
    #[error("{kind} already exists: {key}")]
    Duplicate {
        /// Table name.
        kind: &'static str,
        /// Colliding key, rendered.
        key: String,
    },

    /// A block failed its hash recomputation.
    #[error("Integrity check failed: {0}")]
    Integrity(#[from] CodecError),

    /// A write was forced to fail by the fault injector.
    #[error("Injected fault on {0}")]
    InjectedFault(String),

    /// Backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
