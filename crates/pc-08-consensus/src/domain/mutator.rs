//! # State Mutator
//!
//! Applies one validated transaction to copies of the rows it touches.
//! Nothing here writes to a store; the cycle commits the returned rows
//! together with the block.
//!
//! ## Coin transfer
//!
//! Sender is debited and its nonce moves to one past the transaction
//! nonce, so a transaction signed ahead of the account nonce cannot be
//! applied again. The recipient is credited; an account that already
//! existed gets its nonce bumped, a new one starts at nonce 0.
//!
//! ## Token mint / transfer
//!
//! Placeholder accounts (balance 0) are created for a missing recipient.
//! The token row is replaced only when the incoming token nonce is at
//! least the stored one, so duplicate or out-of-order delivery settles on
//! the highest nonce. `latest_token_id` only moves up.
//!
//! Token transactions leave the sender's account nonce alone. Ownership
//! and the token nonce decide whether a token transaction applies: once
//! a transfer commits, the sender no longer owns the token and a replay
//! fails validation with `NotTokenOwner`. Checking the account nonce here
//! would reject the lower of two competing token updates signed at the
//! same account nonce instead of letting the token nonce settle them.

use crate::domain::error::ValidationError;
use crate::domain::validator::ValidationFindings;
use shared_types::{Account, SignedTransaction, Token, TokenId, TransactionKind, U256};

/// Rows produced by applying one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMutation {
    /// Accounts to write, created or updated.
    pub accounts: Vec<Account>,
    /// Token to write, if the tie-break let the update through.
    pub token: Option<Token>,
    /// Highest allocated token id after this transaction.
    pub latest_token_id: TokenId,
}

/// Apply `signed` on top of the rows in `findings`.
pub fn apply(
    signed: &SignedTransaction,
    findings: &ValidationFindings,
    latest_token_id: TokenId,
) -> Result<StateMutation, ValidationError> {
    match signed.transaction.kind {
        TransactionKind::Coin => apply_coin(signed, findings, latest_token_id),
        TransactionKind::Token => Ok(apply_token(signed, findings, latest_token_id)),
    }
}

fn apply_coin(
    signed: &SignedTransaction,
    findings: &ValidationFindings,
    latest_token_id: TokenId,
) -> Result<StateMutation, ValidationError> {
    let tx = &signed.transaction;
    let mut sender = findings.sender.clone();

    let balance = sender
        .balance
        .checked_sub(tx.value)
        .ok_or(ValidationError::InsufficientBalance {
            address: sender.address,
            balance: sender.balance,
            value: tx.value,
        })?;
    sender.nonce = tx.nonce.saturating_add(U256::one());

    // Authority self transfer: one row, balance unchanged.
    if tx.to == tx.from {
        return Ok(StateMutation {
            accounts: vec![sender],
            token: None,
            latest_token_id,
        });
    }
    sender.balance = balance;

    let recipient = match &findings.recipient {
        Some(existing) => {
            let mut account = existing.clone();
            account.balance = account
                .balance
                .checked_add(tx.value)
                .ok_or(ValidationError::BalanceOverflow { address: tx.to })?;
            account.nonce = account.nonce.saturating_add(U256::one());
            account
        }
        None => Account::new(tx.to, tx.value),
    };

    Ok(StateMutation {
        accounts: vec![sender, recipient],
        token: None,
        latest_token_id,
    })
}

fn apply_token(
    signed: &SignedTransaction,
    findings: &ValidationFindings,
    latest_token_id: TokenId,
) -> StateMutation {
    let tx = &signed.transaction;

    let accounts = if tx.to != tx.from && findings.recipient.is_none() {
        vec![Account::new(tx.to, 0)]
    } else {
        Vec::new()
    };

    let metadata_uri = match (&findings.token, tx.token_metadata_uri.is_empty()) {
        (Some(current), true) => current.metadata_uri.clone(),
        _ => tx.token_metadata_uri.clone(),
    };
    let incoming = Token {
        id: tx.token_id,
        owner: tx.to,
        metadata_uri,
        nonce: tx.token_nonce,
    };

    StateMutation {
        accounts,
        token: resolve_token(findings.token.as_ref(), incoming),
        latest_token_id: latest_token_id.max(tx.token_id),
    }
}

/// Token tie-break: `incoming` wins unless the stored row has a higher nonce.
pub fn resolve_token(current: Option<&Token>, incoming: Token) -> Option<Token> {
    match current {
        Some(current) if incoming.nonce < current.nonce => None,
        _ => Some(incoming),
    }
}
