//! # Resource Locks
//!
//! Table of named async mutexes. The consensus cycle holds
//! [`CONSENSUS_LOCK`] from validation through commit, so two cycles sharing
//! a table never interleave writes on the same state snapshot.
//!
//! Entries are created on first use and never removed; the set of names is
//! small and fixed.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lock serializing consensus cycles.
pub const CONSENSUS_LOCK: &str = "ProofOfAuthorityConsensusMechanism";

/// Named lock table.
#[derive(Debug, Default)]
pub struct ResourceLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held lock; released on drop.
pub type ResourceGuard = OwnedMutexGuard<()>;

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, name: &str) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock();
        table
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait for and take the lock called `name`. Waiters are served FIFO.
    pub async fn lock(&self, name: &str) -> ResourceGuard {
        self.entry(name).lock_owned().await
    }

    /// Take the lock called `name` if it is free.
    pub fn try_lock(&self, name: &str) -> Option<ResourceGuard> {
        self.entry(name).try_lock_owned().ok()
    }

    /// Whether someone holds `name` right now.
    pub fn is_locked(&self, name: &str) -> bool {
        self.table
            .lock()
            .get(name)
            .is_some_and(|m| m.try_lock().is_err())
    }
}
