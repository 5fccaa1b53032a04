//! Port definitions.

pub mod outbound;

pub use outbound::{
    AccountStore, BlockStore, ChainStateStore, ChainStore, MempoolStore, TokenStore,
    TransactionRunner,
};
