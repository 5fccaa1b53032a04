//! Error types for the consensus cycle
//!
//! Three layers:
//! - `ValidationError`: the transaction is wrong; the node is fine.
//! - `StateError`: the node is misconfigured or its chain data is damaged.
//! - `ConsensusError`: everything the cycle can return, including the two above.

use pc_02_chain_storage::StorageError;
use pc_17_block_production::BlockProductionError;
use shared_crypto::{CryptoError, SignatureError};
use shared_types::{Address, ChainId, CodecError, Hash, TokenId, U256};
use thiserror::Error;

/// A transaction that must not be included.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Chain id mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: ChainId, actual: ChainId },

    #[error("Self transfer not allowed for {}", hex::encode(.address))]
    SelfTransferNotAllowed { address: Address },

    #[error("Bad signature: {0}")]
    BadSignature(#[from] SignatureError),

    #[error("Unknown account: {}", hex::encode(.address))]
    UnknownAccount { address: Address },

    #[error("Stale nonce for {}: account is at {current}, transaction carries {actual}", hex::encode(.address))]
    StaleNonce {
        address: Address,
        current: U256,
        actual: U256,
    },

    #[error("Insufficient balance for {}: have {balance}, need {value}", hex::encode(.address))]
    InsufficientBalance {
        address: Address,
        balance: u64,
        value: u64,
    },

    #[error("Balance overflow crediting {}", hex::encode(.address))]
    BalanceOverflow { address: Address },

    #[error("Token transaction for token {token_id} carries value {value}")]
    TokenValueNotZero { token_id: TokenId, value: u64 },

    #[error("{} does not own token {token_id} (owner {})", hex::encode(.sender), hex::encode(.owner))]
    NotTokenOwner {
        token_id: TokenId,
        owner: Address,
        sender: Address,
    },
}

/// The node cannot run the cycle with the data it has.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("No blockchain state for chain {chain_id}; genesis missing")]
    MissingChainState { chain_id: ChainId },

    #[error("Head block {} not found", hex::encode(.hash))]
    MissingPreviousBlock { hash: Hash },

    #[error("No key available for authority {}", hex::encode(.address))]
    MissingAuthorityKey { address: Address },

    #[error("Authority key mismatch: expected {}, key is {}", hex::encode(.expected), hex::encode(.actual))]
    AuthorityMismatch { expected: Address, actual: Address },
}

/// Errors returned by the consensus cycle.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },

    #[error("Cycle cancelled before commit")]
    Cancelled,

    #[error("Commit failed, nothing written: {0}")]
    Commit(StorageError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Signing failed: {0}")]
    Signing(#[from] CryptoError),

    #[error("Block production error: {0}")]
    BlockProduction(BlockProductionError),

    #[error("Encoding error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<BlockProductionError> for ConsensusError {
    fn from(err: BlockProductionError) -> Self {
        match err {
            BlockProductionError::MiningCancelled { attempts } => Self::MiningCancelled { attempts },
            BlockProductionError::Storage(e) => Self::Storage(e),
            BlockProductionError::Codec(e) => Self::Codec(e),
            BlockProductionError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            other => Self::BlockProduction(other),
        }
    }
}

impl ConsensusError {
    /// The node must stop: its state, keys or store are not usable.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::State(_)
            | Self::Commit(_)
            | Self::Signing(_)
            | Self::Codec(_)
            | Self::InvalidConfig(_) => true,
            Self::BlockProduction(e) => e.is_critical(),
            _ => false,
        }
    }

    /// The loop may carry on with the next mempool entry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::MiningCancelled { .. } | Self::Cancelled | Self::Storage(_)
        )
    }
}

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;
