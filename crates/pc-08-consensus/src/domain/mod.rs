//! Consensus domain: errors, validation, state mutation, resource locks.

pub mod error;
pub mod locks;
pub mod mutator;
pub mod validator;

pub use error::{ConsensusError, ConsensusResult, StateError, ValidationError};
pub use locks::{ResourceGuard, ResourceLocks, CONSENSUS_LOCK};
pub use mutator::{apply, resolve_token, StateMutation};
pub use validator::{TransactionValidator, ValidationFindings};
