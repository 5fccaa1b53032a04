//! Requester error types.
//!
//! Everything that can stop a mint, transfer or submission before the
//! transaction reaches the mempool.

use pc_02_chain_storage::StorageError;
use shared_crypto::{CryptoError, SignatureError};
use shared_types::{Address, ChainId, CodecError, Hash, TokenId};
use thiserror::Error;

/// Requester error type.
#[derive(Debug, Error)]
pub enum RequesterError {
    /// No chain head for the chain; genesis has not run.
    #[error("No blockchain state for chain {0}")]
    MissingChainState(ChainId),

    /// Chain head points at a block that is not stored.
    #[error("Head block {} not found", hex::encode(.0))]
    MissingHeadBlock(Hash),

    /// Head block was signed by someone other than the configured authority.
    #[error("Head block validator {} is not the configured authority {}", hex::encode(.actual), hex::encode(.expected))]
    AuthorityMismatch { expected: Address, actual: Address },

    /// Token id does not exist.
    #[error("Unknown token {0}")]
    UnknownToken(TokenId),

    /// Claimed owner does not hold the token.
    #[error("{} does not own token {token_id} (owner {})", hex::encode(.claimed), hex::encode(.owner))]
    NotTokenOwner {
        token_id: TokenId,
        owner: Address,
        claimed: Address,
    },

    /// Sender account does not exist.
    #[error("Unknown account {}", hex::encode(.0))]
    UnknownAccount(Address),

    /// Balance does not cover the transfer.
    #[error("Insufficient balance: have {balance}, need {value}")]
    InsufficientBalance { balance: u64, value: u64 },

    /// Sender and recipient are the same.
    #[error("Transfer to self from {}", hex::encode(.0))]
    SelfTransfer(Address),

    /// Mint without metadata.
    #[error("Token metadata uri must not be empty")]
    EmptyMetadataUri,

    /// Token id space used up.
    #[error("Token id space exhausted")]
    TokenIdExhausted,

    /// Submitted transaction targets another chain.
    #[error("Chain id mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: ChainId, actual: ChainId },

    /// Submitted transaction signature does not recover to its sender.
    #[error("Bad signature: {0}")]
    Signature(#[from] SignatureError),

    /// Signing key unavailable or signing failed.
    #[error("Key error: {0}")]
    Key(#[from] CryptoError),

    /// Store failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Encoding failure.
    #[error("Encoding error: {0}")]
    Codec(#[from] CodecError),
}

impl RequesterError {
    /// The request itself was wrong; retrying it unchanged fails again.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownToken(_)
                | Self::NotTokenOwner { .. }
                | Self::UnknownAccount(_)
                | Self::InsufficientBalance { .. }
                | Self::SelfTransfer(_)
                | Self::EmptyMetadataUri
                | Self::ChainMismatch { .. }
                | Self::Signature(_)
        )
    }
}

/// Result type for requester operations.
pub type Result<T> = std::result::Result<T, RequesterError>;
