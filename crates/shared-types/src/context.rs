//! # Chain Context and Cancellation
//!
//! `ChainContext` carries the chain-wide facts every component needs (chain
//! id, the authority identity) by reference instead of through globals.
//! `Cancellation` is the cooperative stop signal observed while waiting for
//! mempool insertions and inside the mining loop.

use crate::entities::{Address, ChainId, Validator};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Chain-wide facts shared by the cycle and the requesters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainContext {
    /// Chain this node produces blocks for.
    pub chain_id: ChainId,
    /// The single block-signing authority.
    pub authority: Validator,
    /// Address derived from the authority public key.
    pub authority_address: Address,
}

impl ChainContext {
    /// Whether `address` is the authority.
    pub fn is_authority(&self, address: &Address) -> bool {
        &self.authority_address == address
    }
}

/// Owning side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal cancellation to every linked `Cancellation`.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// New observer of this handle.
    pub fn token(&self) -> Cancellation {
        Cancellation {
            receiver: self.sender.subscribe(),
            deadline: None,
        }
    }
}

/// Observer side of a cancellation signal, optionally with a deadline.
#[derive(Debug, Clone)]
pub struct Cancellation {
    receiver: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Create a linked handle/token pair.
pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (sender, receiver) = watch::channel(false);
    (
        CancelHandle { sender },
        Cancellation {
            receiver,
            deadline: None,
        },
    )
}

impl Cancellation {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self {
            receiver,
            deadline: None,
        }
    }

    /// Child token that additionally expires after `timeout`.
    /// An earlier parent deadline is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            receiver: self.receiver.clone(),
            deadline: Some(deadline),
        }
    }

    /// Non-blocking check; cheap enough for every mining iteration.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once cancelled or expired.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            match self.deadline {
                Some(deadline) => {
                    tokio::select! {
                        changed = receiver.changed() => {
                            if changed.is_err() {
                                // Handle dropped: only the deadline can fire now.
                                tokio::time::sleep_until(deadline).await;
                                return;
                            }
                        }
                        _ = tokio::time::sleep_until(deadline) => return,
                    }
                }
                None => {
                    if receiver.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
            }
        }
    }
}
