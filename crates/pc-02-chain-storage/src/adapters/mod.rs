//! Adapters: the in-memory store and its insertion notifications.

pub mod memory;
pub mod notifications;

pub use memory::InMemoryChainStore;
pub use notifications::InsertionStream;
