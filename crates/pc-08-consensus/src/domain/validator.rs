//! # Transaction Validator
//!
//! Decides whether one signed transaction may enter the next block.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. chain id
//! 2. self transfer (allowed for the authority, which mints to itself)
//! 3. signature recovers to `from`
//! 4. sender account exists
//! 5. coin: nonce not stale, balance covers value
//!    token: value is zero, an existing token is owned by the sender
//!
//! A token that does not exist yet passes: it is a pending mint.

use crate::domain::error::{ConsensusResult, ValidationError};
use pc_02_chain_storage::{AccountStore, TokenStore};
use shared_crypto::verify_signature;
use shared_types::{Account, Address, ChainId, SignedTransaction, Token, TransactionKind};
use tracing::instrument;

/// Rows the validator looked at, handed on to the state mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFindings {
    /// Sender account as stored.
    pub sender: Account,
    /// Recipient account, if it exists and differs from the sender.
    pub recipient: Option<Account>,
    /// Referenced token, if this is a token transaction on an existing token.
    pub token: Option<Token>,
}

/// Validates transactions for one chain and authority.
#[derive(Debug, Clone)]
pub struct TransactionValidator {
    chain_id: ChainId,
    authority: Address,
}

impl TransactionValidator {
    pub fn new(chain_id: ChainId, authority: Address) -> Self {
        Self {
            chain_id,
            authority,
        }
    }

    /// Checks that need no stored state: chain id, self transfer, signature.
    pub fn check_envelope(&self, signed: &SignedTransaction) -> Result<(), ValidationError> {
        let tx = &signed.transaction;

        if tx.chain_id != self.chain_id {
            return Err(ValidationError::ChainMismatch {
                expected: self.chain_id,
                actual: tx.chain_id,
            });
        }

        if tx.from == tx.to && tx.from != self.authority {
            return Err(ValidationError::SelfTransferNotAllowed { address: tx.from });
        }

        verify_signature(signed)?;
        Ok(())
    }

    /// Checks against the sender account and the referenced token.
    pub fn check_state(
        &self,
        signed: &SignedTransaction,
        sender: Option<&Account>,
        token: Option<&Token>,
    ) -> Result<(), ValidationError> {
        let tx = &signed.transaction;
        let sender = sender.ok_or(ValidationError::UnknownAccount { address: tx.from })?;

        match tx.kind {
            TransactionKind::Coin => {
                if tx.nonce < sender.nonce {
                    return Err(ValidationError::StaleNonce {
                        address: tx.from,
                        current: sender.nonce,
                        actual: tx.nonce,
                    });
                }
                if tx.value > sender.balance {
                    return Err(ValidationError::InsufficientBalance {
                        address: tx.from,
                        balance: sender.balance,
                        value: tx.value,
                    });
                }
            }
            TransactionKind::Token => {
                if tx.value != 0 {
                    return Err(ValidationError::TokenValueNotZero {
                        token_id: tx.token_id,
                        value: tx.value,
                    });
                }
                if let Some(token) = token {
                    if token.owner != sender.address {
                        return Err(ValidationError::NotTokenOwner {
                            token_id: token.id,
                            owner: token.owner,
                            sender: sender.address,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Run every check, loading the rows it needs from `store`.
    #[instrument(skip(self, signed, store), fields(from = %hex::encode(signed.transaction.from), kind = ?signed.transaction.kind))]
    pub async fn validate<S>(
        &self,
        signed: &SignedTransaction,
        store: &S,
    ) -> ConsensusResult<ValidationFindings>
    where
        S: AccountStore + TokenStore + ?Sized,
    {
        self.check_envelope(signed)?;

        let tx = &signed.transaction;
        let sender = store.get_by_address(&tx.from).await?;
        let token = match tx.kind {
            TransactionKind::Token => store.get_by_id(tx.token_id).await?,
            TransactionKind::Coin => None,
        };

        self.check_state(signed, sender.as_ref(), token.as_ref())?;

        let recipient = if tx.to == tx.from {
            None
        } else {
            store.get_by_address(&tx.to).await?
        };

        Ok(ValidationFindings {
            sender: sender.ok_or(ValidationError::UnknownAccount { address: tx.from })?,
            recipient,
            token,
        })
    }
}
