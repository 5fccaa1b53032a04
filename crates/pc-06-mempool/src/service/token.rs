//! # Token Requester
//!
//! Mint: the authority mints to itself, id = next after the chain-wide
//! counter (and after any mint this process already queued), token nonce 0.
//!
//! Transfer: the on-chain owner must match the claimed owner; the new token
//! nonce is the current one plus one and the owner's key signs.

use super::{current_head, enqueue};
use crate::domain::{RequesterError, Result, TokenIdReservation};
use pc_02_chain_storage::{AccountStore, ChainStore, TokenStore};
use shared_crypto::KeyProvider;
use shared_types::{Address, ChainContext, TokenId, Transaction, U256};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Queues token mints and transfers.
pub struct TokenRequester {
    store: Arc<dyn ChainStore>,
    keys: Arc<dyn KeyProvider>,
    ctx: ChainContext,
    ids: TokenIdReservation,
}

impl TokenRequester {
    pub fn new(store: Arc<dyn ChainStore>, keys: Arc<dyn KeyProvider>, ctx: ChainContext) -> Self {
        Self {
            store,
            keys,
            ctx,
            ids: TokenIdReservation::new(),
        }
    }

    async fn account_nonce(&self, address: &Address) -> Result<U256> {
        Ok(self
            .store
            .get_by_address(address)
            .await?
            .map(|account| account.nonce)
            .unwrap_or_default())
    }

    /// Queue a mint of a new token; returns its id.
    #[instrument(skip(self), fields(chain_id = self.ctx.chain_id))]
    pub async fn mint(&self, metadata_uri: &str) -> Result<TokenId> {
        if metadata_uri.is_empty() {
            return Err(RequesterError::EmptyMetadataUri);
        }

        let (state, authority) = current_head(&*self.store, &self.ctx).await?;
        let token_id = self
            .ids
            .reserve(state.latest_token_id)
            .ok_or(RequesterError::TokenIdExhausted)?;
        let nonce = self.account_nonce(&authority).await?;

        let tx = Transaction::token(
            self.ctx.chain_id,
            nonce,
            authority,
            authority,
            token_id,
            metadata_uri,
            U256::zero(),
        );
        let signed = self.keys.key_for(&authority)?.sign_transaction(tx)?;
        let mempool_id = enqueue(&*self.store, signed).await?;

        info!(token_id, %mempool_id, "Mint queued");
        Ok(token_id)
    }

    /// Queue a transfer of `token_id` from `owner` to `recipient`; returns
    /// the mempool id.
    #[instrument(skip(self, owner, recipient), fields(chain_id = self.ctx.chain_id))]
    pub async fn transfer(&self, token_id: TokenId, owner: Address, recipient: Address) -> Result<Uuid> {
        if owner == recipient {
            return Err(RequesterError::SelfTransfer(owner));
        }
        current_head(&*self.store, &self.ctx).await?;

        let token = self
            .store
            .get_by_id(token_id)
            .await?
            .ok_or(RequesterError::UnknownToken(token_id))?;
        if token.owner != owner {
            return Err(RequesterError::NotTokenOwner {
                token_id,
                owner: token.owner,
                claimed: owner,
            });
        }
        let nonce = self.account_nonce(&owner).await?;

        let tx = Transaction::token(
            self.ctx.chain_id,
            nonce,
            owner,
            recipient,
            token_id,
            token.metadata_uri,
            token.nonce.saturating_add(U256::one()),
        );
        let signed = self.keys.key_for(&owner)?.sign_transaction(tx)?;
        let mempool_id = enqueue(&*self.store, signed).await?;

        info!(token_id, %mempool_id, "Token transfer queued");
        Ok(mempool_id)
    }
}
