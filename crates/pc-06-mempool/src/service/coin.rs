//! # Coin Requester
//!
//! Signs a coin transfer with the sender's key and queues it. Nonces are
//! reserved per sender so back-to-back requests do not collide before the
//! first one is committed.

use super::enqueue;
use crate::domain::{NonceReservation, RequesterError, Result};
use pc_02_chain_storage::{AccountStore, ChainStore};
use shared_crypto::KeyProvider;
use shared_types::{Address, ChainContext, Transaction};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Queues coin transfers.
pub struct CoinRequester {
    store: Arc<dyn ChainStore>,
    keys: Arc<dyn KeyProvider>,
    ctx: ChainContext,
    nonces: NonceReservation,
}

impl CoinRequester {
    pub fn new(store: Arc<dyn ChainStore>, keys: Arc<dyn KeyProvider>, ctx: ChainContext) -> Self {
        Self {
            store,
            keys,
            ctx,
            nonces: NonceReservation::new(),
        }
    }

    /// Queue `value` coins from `from` to `to`; returns the mempool id.
    #[instrument(skip(self, from, to), fields(chain_id = self.ctx.chain_id))]
    pub async fn transfer(&self, from: Address, to: Address, value: u64) -> Result<Uuid> {
        if from == to && !self.ctx.is_authority(&from) {
            return Err(RequesterError::SelfTransfer(from));
        }

        let account = self
            .store
            .get_by_address(&from)
            .await?
            .ok_or(RequesterError::UnknownAccount(from))?;
        if value > account.balance {
            return Err(RequesterError::InsufficientBalance {
                balance: account.balance,
                value,
            });
        }

        let key = self.keys.key_for(&from)?;
        let nonce = self.nonces.reserve(from, account.nonce);
        let signed = key.sign_transaction(Transaction::coin(self.ctx.chain_id, nonce, from, to, value))?;
        let mempool_id = enqueue(&*self.store, signed).await?;

        info!(value, %mempool_id, "Coin transfer queued");
        Ok(mempool_id)
    }
}
