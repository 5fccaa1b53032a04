//! # Chain Storage (pc-02)
//!
//! Persistence ports for the PoA node and an in-memory implementation.
//!
//! ## Stores
//!
//! | Port | Rows | Notes |
//! |------|------|-------|
//! | `MempoolStore` | `MempoolTransaction` | insertion-ordered, insertion notifications |
//! | `AccountStore` | `Account` | full listing for state hashing |
//! | `TokenStore` | `Token` | full listing for state hashing |
//! | `BlockStore` | `BlockData` | hash checked on write |
//! | `ChainStateStore` | `BlockchainState` | one row per chain id |
//! | `TransactionRunner` | all of the above | all-or-nothing `WriteBatch` commit |
//!
//! ## Atomicity
//!
//! The consensus cycle never writes rows one by one. It fills a
//! `WriteBatch` (accounts, token, block, chain head, mempool delete) and
//! hands it to `TransactionRunner::commit`. Either every write lands or
//! none does.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Errors, write batches, configuration
//! - `ports/` - Store traits
//! - `adapters/` - In-memory store, insertion stream

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{InMemoryChainStore, InsertionStream};
pub use domain::{Result, StorageError, StoreConfig, WriteBatch, WriteKind, WriteOp};
pub use ports::{
    AccountStore, BlockStore, ChainStateStore, ChainStore, MempoolStore, TokenStore,
    TransactionRunner,
};
