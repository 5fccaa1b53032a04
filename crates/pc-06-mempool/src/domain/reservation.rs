//! In-process reservations.
//!
//! Requests run concurrently and the chain only catches up once the
//! consensus cycle commits. Reservations make sure two requests issued
//! before that commit never get the same token id or sender nonce.

use parking_lot::Mutex;
use shared_types::{Address, TokenId, U256};
use std::collections::HashMap;

/// Hands out token ids above the on-chain counter.
#[derive(Debug, Default)]
pub struct TokenIdReservation {
    last: Mutex<TokenId>,
}

impl TokenIdReservation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id after `max(latest_on_chain, last reserved)`, or `None` when
    /// the id space is used up.
    pub fn reserve(&self, latest_on_chain: TokenId) -> Option<TokenId> {
        let mut last = self.last.lock();
        let next = latest_on_chain.max(*last).checked_add(1)?;
        *last = next;
        Some(next)
    }
}

/// Hands out per-sender account nonces at or above the on-chain nonce.
#[derive(Debug, Default)]
pub struct NonceReservation {
    next: Mutex<HashMap<Address, U256>>,
}

impl NonceReservation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nonce to sign with for `sender` whose stored nonce is `on_chain`.
    pub fn reserve(&self, sender: Address, on_chain: U256) -> U256 {
        let mut next = self.next.lock();
        let slot = next.entry(sender).or_insert(on_chain);
        let nonce = (*slot).max(on_chain);
        *slot = nonce.saturating_add(U256::one());
        nonce
    }
}
