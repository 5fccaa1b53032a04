//! Error types for block production

use pc_02_chain_storage::StorageError;
use shared_types::CodecError;
use thiserror::Error;

/// Result type alias for block production operations
pub type Result<T> = std::result::Result<T, BlockProductionError>;

/// Errors that can occur during block production
#[derive(Debug, Error)]
pub enum BlockProductionError {
    /// Mining was cancelled or its deadline passed
    #[error("Mining cancelled after {attempts} attempts")]
    MiningCancelled {
        /// Nonces tried before stopping
        attempts: u64,
    },

    /// The whole nonce space was searched without a match
    #[error("Mining failed: no valid nonce found")]
    MiningFailed,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Proof requested for a transaction outside the tree
    #[error("Transaction index {index} out of range (count {count})")]
    ProofIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Transactions in the tree
        count: usize,
    },

    /// Canonical encoding failed
    #[error("Encoding error: {0}")]
    Codec(#[from] CodecError),

    /// Loading rows for hashing failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl BlockProductionError {
    /// Check if error is recoverable (should retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MiningCancelled { .. } | Self::Storage(_))
    }

    /// Check if error is critical (should stop production)
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::InvalidConfig(_) | Self::InternalError(_))
    }
}
