//! # Mempool Requesters (pc-06)
//!
//! Builds signed transactions and queues them for the consensus cycle.
//!
//! ## Purpose
//!
//! Several API handlers may call these at once; exactly one consensus cycle
//! drains the mempool. Requesters only read chain state and write to the
//! mempool.
//!
//! | Requester | Operation | Signs with |
//! |-----------|-----------|------------|
//! | `TokenRequester::mint` | new token, id = latest + 1, token nonce 0 | authority key |
//! | `TokenRequester::transfer` | owner check, token nonce + 1 | owner key |
//! | `CoinRequester::transfer` | balance pre-check, reserved account nonce | sender key |
//! | `MempoolSubmitter::submit` | chain id + signature admission | (already signed) |
//!
//! ## Reservations
//!
//! Token ids and sender nonces handed out by this process are remembered,
//! so requests issued before the cycle commits never collide.

pub mod domain;
pub mod service;

pub use domain::{NonceReservation, RequesterError, Result, TokenIdReservation};
pub use service::{CoinRequester, MempoolSubmitter, TokenRequester};
