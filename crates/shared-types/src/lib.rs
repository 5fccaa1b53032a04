//! # Shared Types Crate
//!
//! This crate contains the chain's domain entities, their canonical
//! encoding, and the context handles passed into every component.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Deterministic Encoding**: Anything that gets hashed goes through
//!   [`codec::canonical_bytes`], never through map iteration.
//! - **No Hidden Globals**: Chain-wide facts travel in [`ChainContext`].

pub mod codec;
pub mod context;
pub mod entities;
pub mod serde_helpers;

pub use codec::{canonical_bytes, canonical_hash, keccak256, to_hex, CodecError};
pub use context::{cancellation, CancelHandle, Cancellation, ChainContext};
pub use entities::*;

/// Current unix time in seconds.
pub fn unix_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Current unix time in milliseconds.
pub fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
