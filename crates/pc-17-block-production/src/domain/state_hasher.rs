//! # State Hasher
//!
//! One hash over the whole account set or token set.
//!
//! Rows are sorted by a stable key (address, token id), each row is encoded
//! with the canonical fixed-field-order encoding, the encodings are
//! concatenated and the result is hashed with keccak-256. Store iteration
//! order never leaks into the result.
//!
//! The store-backed variants overlay rows that are about to be written, so
//! the cycle can compute post-block roots before anything is committed.

use crate::error::Result;
use pc_02_chain_storage::{AccountStore, TokenStore};
use shared_types::{canonical_bytes, keccak256, Account, Hash, Token};
use std::collections::BTreeMap;

/// Hash of an account set.
pub fn hash_accounts(accounts: &[Account]) -> Result<Hash> {
    let sorted: BTreeMap<_, _> = accounts.iter().map(|a| (a.address, a)).collect();
    let mut buf = Vec::new();
    for account in sorted.values() {
        buf.extend_from_slice(&canonical_bytes(account)?);
    }
    Ok(keccak256(&buf))
}

/// Hash of a token set.
pub fn hash_tokens(tokens: &[Token]) -> Result<Hash> {
    let sorted: BTreeMap<_, _> = tokens.iter().map(|t| (t.id, t)).collect();
    let mut buf = Vec::new();
    for token in sorted.values() {
        buf.extend_from_slice(&canonical_bytes(token)?);
    }
    Ok(keccak256(&buf))
}

/// Account-set hash of the store with `pending` rows applied on top.
pub async fn account_root<S>(store: &S, pending: &[Account]) -> Result<Hash>
where
    S: AccountStore + ?Sized,
{
    let mut rows: BTreeMap<_, _> = AccountStore::list_all(store)
        .await?
        .into_iter()
        .map(|a| (a.address, a))
        .collect();
    for account in pending {
        rows.insert(account.address, account.clone());
    }
    hash_accounts(&rows.into_values().collect::<Vec<_>>())
}

/// Token-set hash of the store with `pending` rows applied on top.
pub async fn token_root<S>(store: &S, pending: &[Token]) -> Result<Hash>
where
    S: TokenStore + ?Sized,
{
    let mut rows: BTreeMap<_, _> = TokenStore::list_all(store)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();
    for token in pending {
        rows.insert(token.id, token.clone());
    }
    hash_tokens(&rows.into_values().collect::<Vec<_>>())
}
