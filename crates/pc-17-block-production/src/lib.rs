//! # Block Production (pc-17)
//!
//! Turns one validated transaction and the post-transaction state into a
//! mined block header.
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | `MerkleTree` | `trans_root` over the block transactions, inclusion proofs |
//! | `hash_accounts` / `hash_tokens` | order-independent state and token roots |
//! | `DifficultyMiner` | cancellable leading-zero nonce search |
//! | `BlockAssembler` | header construction on top of the previous block |
//!
//! Signing and committing the block are the consensus cycle's job.

pub mod config;
pub mod domain;
pub mod error;

pub use config::{MiningConfig, NonceStart, MAX_DIFFICULTY};
pub use domain::*;
pub use error::{BlockProductionError, Result};
