//! # Integration Tests
//!
//! Cross-crate flows over a bootstrapped in-memory chain.
//!
//! - `scenarios` - requester to committed block
//! - `atomicity` - fault injection, replay, token update races
//! - `properties` - signing, state hashing and merkle determinism

pub mod atomicity;
pub mod properties;
pub mod scenarios;
