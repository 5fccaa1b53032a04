//! Domain layer: errors, write batches and store configuration.

pub mod batch;
pub mod config;
pub mod errors;

pub use batch::{WriteBatch, WriteKind, WriteOp};
pub use config::StoreConfig;
pub use errors::{Result, StorageError};
