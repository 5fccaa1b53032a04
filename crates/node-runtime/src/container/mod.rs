//! # Subsystem Container
//!
//! Configuration plus the wired components of a running node.
//!
//! - One `InMemoryChainStore` shared by the cycle and every requester
//! - One `FileKeyProvider` for the authority and custodial user keys
//! - Exactly one `ConsensusCycle` writing chain state

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, GenesisConfig, KeystoreConfig, NodeConfig};
pub use subsystems::SubsystemContainer;
