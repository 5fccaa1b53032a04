//! # PoA-Chain Test Suite
//!
//! Unified test crate for flows that span several crates.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (mining, merkle, signatures)
//! └── src/
//!     ├── harness.rs    # Genesis-bootstrapped chain + consensus cycle
//!     └── integration/  # Cross-crate scenarios and properties
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pc-tests
//!
//! # By category
//! cargo test -p pc-tests integration::scenarios::
//! cargo test -p pc-tests integration::properties::
//!
//! # Benchmarks
//! cargo bench -p pc-tests
//! ```

pub mod harness;
pub mod integration;
