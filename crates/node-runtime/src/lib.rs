//! # Node Runtime Library
//!
//! This library exposes the internal modules of the node runtime for testing.
//! The main entry point is the `main.rs` binary.
//!
//! ## Modular Structure
//!
//! - `container/` - Configuration and component wiring
//! - `genesis/` - Chain initialization
//! - `runtime` - Startup, the consensus task and graceful shutdown

pub mod container;
pub mod genesis;
pub mod runtime;

pub use container::{ConfigError, NodeConfig, SubsystemContainer};
pub use runtime::NodeRuntime;
