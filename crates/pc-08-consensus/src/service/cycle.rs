//! # Consensus Cycle
//!
//! The single writer of chain state. One mempool entry per iteration:
//!
//! ```text
//! WAIT_TX -> VALIDATE -> MUTATE_STATE -> ASSEMBLE_BLOCK -> MINE -> SIGN -> COMMIT
//!    ^                                                                      |
//!    +----------------------------------------------------------------------+
//! ```
//!
//! [`CONSENSUS_LOCK`] is held from VALIDATE to COMMIT. COMMIT is one
//! `WriteBatch`: touched accounts, the token, the block, the chain head and
//! the deletion of the consumed mempool entry. A failed commit writes
//! nothing and the entry stays in the mempool.
//!
//! ## Loop policy
//!
//! `process` reports every failure. `run` decides:
//!
//! | Error | `run` |
//! |-------|-------|
//! | validation | log, keep the entry, next entry (or stop if `halt_on_validation_error`) |
//! | cancellation of the whole node | return `Ok` |
//! | mining deadline | log, keep the entry, re-read the mempool after `retry_backoff_ms` |
//! | storage read | log, next entry |
//! | state / commit / signing | return the error |

use crate::config::ConsensusConfig;
use crate::domain::{
    apply, ConsensusError, ConsensusResult, ResourceLocks, StateError, TransactionValidator,
    CONSENSUS_LOCK,
};
use crate::metrics::CycleMetrics;
use parking_lot::RwLock;
use pc_02_chain_storage::{BlockStore, ChainStateStore, ChainStore, MempoolStore, TransactionRunner};
use pc_17_block_production::{account_root, token_root, AssemblyInput, BlockAssembler};
use shared_crypto::{CryptoError, KeyProvider, Secp256k1KeyPair};
use shared_types::{
    unix_seconds, BlockData, BlockchainState, Cancellation, ChainContext, Hash, MempoolTransaction,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Phase of the consensus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    WaitTx,
    Validate,
    MutateState,
    AssembleBlock,
    Mine,
    Sign,
    Commit,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WaitTx => "WAIT_TX",
            Self::Validate => "VALIDATE",
            Self::MutateState => "MUTATE_STATE",
            Self::AssembleBlock => "ASSEMBLE_BLOCK",
            Self::Mine => "MINE",
            Self::Sign => "SIGN",
            Self::Commit => "COMMIT",
        };
        f.write_str(name)
    }
}

/// What one `process` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A block including the entry was committed.
    Committed(CommittedBlock),
    /// The entry was no longer in the mempool.
    Skipped { mempool_id: Uuid },
}

/// Summary of a committed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedBlock {
    pub mempool_id: Uuid,
    pub number: u64,
    pub hash: Hash,
    pub attempts: u64,
    pub elapsed: Duration,
}

enum Next {
    Continue,
    /// An entry missed its mining deadline and is still queued.
    Retry,
    Stop,
}

/// Drains the mempool into blocks.
pub struct ConsensusCycle {
    store: Arc<dyn ChainStore>,
    keys: Arc<dyn KeyProvider>,
    ctx: ChainContext,
    config: ConsensusConfig,
    assembler: BlockAssembler,
    validator: TransactionValidator,
    locks: Arc<ResourceLocks>,
    metrics: Arc<CycleMetrics>,
    mining_timeout: RwLock<Option<Duration>>,
    state: RwLock<CycleState>,
}

impl fmt::Debug for ConsensusCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsensusCycle")
            .field("chain_id", &self.ctx.chain_id)
            .field("authority", &hex::encode(self.ctx.authority_address))
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl ConsensusCycle {
    /// Cycle for `ctx.chain_id`, writing through `store` and signing with
    /// the authority key from `keys`.
    pub fn new(
        store: Arc<dyn ChainStore>,
        keys: Arc<dyn KeyProvider>,
        ctx: ChainContext,
        config: ConsensusConfig,
    ) -> ConsensusResult<Self> {
        config.validate()?;
        if config.chain_id != ctx.chain_id {
            return Err(ConsensusError::InvalidConfig(format!(
                "configured chain {} but context is chain {}",
                config.chain_id, ctx.chain_id
            )));
        }
        let assembler = BlockAssembler::new(config.mining.clone())?;
        let validator = TransactionValidator::new(ctx.chain_id, ctx.authority_address);

        let mining_timeout = RwLock::new(config.mining_timeout());
        Ok(Self {
            store,
            keys,
            ctx,
            config,
            assembler,
            validator,
            locks: Arc::new(ResourceLocks::new()),
            metrics: Arc::new(CycleMetrics::new()),
            mining_timeout,
            state: RwLock::new(CycleState::WaitTx),
        })
    }

    /// Share a lock table with other cycles on the same store.
    pub fn with_locks(mut self, locks: Arc<ResourceLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Current phase.
    pub fn state(&self) -> CycleState {
        *self.state.read()
    }

    pub fn metrics(&self) -> Arc<CycleMetrics> {
        self.metrics.clone()
    }

    pub fn context(&self) -> &ChainContext {
        &self.ctx
    }

    /// Replace the per-block mining deadline; `None` removes it.
    /// Takes effect from the next block.
    pub fn set_mining_timeout(&self, timeout: Option<Duration>) {
        *self.mining_timeout.write() = timeout;
    }

    fn enter(&self, next: CycleState) {
        *self.state.write() = next;
        debug!(phase = %next, "Consensus phase");
    }

    fn authority_key(&self) -> ConsensusResult<Secp256k1KeyPair> {
        let address = self.ctx.authority_address;
        let key = self.keys.key_for(&address).map_err(|e| match e {
            CryptoError::KeyNotFound(_) => ConsensusError::State(StateError::MissingAuthorityKey { address }),
            other => ConsensusError::Signing(other),
        })?;
        if key.address() != address {
            return Err(StateError::AuthorityMismatch {
                expected: address,
                actual: key.address(),
            }
            .into());
        }
        Ok(key)
    }

    /// Turn one mempool entry into a committed block.
    #[instrument(skip(self, entry, cancel), fields(chain_id = self.ctx.chain_id, mempool_id = %entry.id))]
    pub async fn process(
        &self,
        entry: MempoolTransaction,
        cancel: &Cancellation,
    ) -> ConsensusResult<CycleOutcome> {
        let _guard = self.locks.lock(CONSENSUS_LOCK).await;
        let result = self.process_locked(entry, cancel).await;
        self.enter(CycleState::WaitTx);
        result
    }

    async fn process_locked(
        &self,
        entry: MempoolTransaction,
        cancel: &Cancellation,
    ) -> ConsensusResult<CycleOutcome> {
        let store = &*self.store;

        // Another cycle, or an earlier pass of this one, may have consumed
        // it. The stored row wins over the notified copy.
        let entry = match store.get(&entry.id).await? {
            Some(current) => current,
            None => {
                self.metrics.record_skipped();
                debug!("Entry already consumed");
                return Ok(CycleOutcome::Skipped {
                    mempool_id: entry.id,
                });
            }
        };

        let chain_state = store
            .get_by_chain_id(self.ctx.chain_id)
            .await?
            .ok_or(StateError::MissingChainState {
                chain_id: self.ctx.chain_id,
            })?;
        let previous = store
            .get_by_hash(&chain_state.latest_hash)
            .await?
            .ok_or(StateError::MissingPreviousBlock {
                hash: chain_state.latest_hash,
            })?;

        self.enter(CycleState::Validate);
        let findings = self.validator.validate(&entry.signed, store).await?;

        self.enter(CycleState::MutateState);
        let mutation = apply(&entry.signed, &findings, chain_state.latest_token_id)?;
        let state_root = account_root(store, &mutation.accounts).await?;
        let tokens_root = token_root(store, mutation.token.as_slice()).await?;

        self.enter(CycleState::AssembleBlock);
        let now = unix_seconds();
        let block_tx = self.assembler.block_transaction(entry.signed.clone(), now);
        let pending = self.assembler.assemble(AssemblyInput {
            previous: &previous,
            transactions: vec![block_tx],
            state_root,
            tokens_root,
            latest_token_id: mutation.latest_token_id,
            beneficiary: self.ctx.authority_address,
            now,
        })?;

        self.enter(CycleState::Mine);
        let timeout = *self.mining_timeout.read();
        let mining_cancel = match timeout {
            Some(timeout) => cancel.with_timeout(timeout),
            None => cancel.clone(),
        };
        let mined = match self.assembler.mine(pending, mining_cancel).await {
            Ok(mined) => mined,
            Err(e) => {
                let err = ConsensusError::from(e);
                if matches!(err, ConsensusError::MiningCancelled { .. }) {
                    self.metrics.record_mining_cancelled();
                }
                return Err(err);
            }
        };

        self.enter(CycleState::Sign);
        let key = self.authority_key()?;
        let header_signature = key.sign_header(&mined.header)?;
        let block = BlockData::new(
            mined.header,
            header_signature,
            mined.transactions,
            self.ctx.authority.clone(),
        )?;

        self.enter(CycleState::Commit);
        let head = BlockchainState {
            chain_id: self.ctx.chain_id,
            latest_block_number: block.header.number,
            latest_hash: block.hash,
            latest_token_id: mutation.latest_token_id,
            account_hash_state: state_root,
            token_hash_state: tokens_root,
        };
        let committed = CommittedBlock {
            mempool_id: entry.id,
            number: block.header.number,
            hash: block.hash,
            attempts: mined.outcome.attempts,
            elapsed: mined.outcome.elapsed,
        };

        let mut batch = store.begin();
        for account in mutation.accounts {
            batch.put_account(account);
        }
        if let Some(token) = mutation.token {
            batch.put_token(token);
        }
        batch
            .put_block(block)
            .put_chain_state(head)
            .delete_mempool(entry.id);

        if cancel.is_cancelled() {
            store.abort(batch);
            return Err(ConsensusError::Cancelled);
        }

        if let Err(e) = store.commit(batch).await {
            self.metrics.record_commit_failure();
            error!(error = %e, "Atomic commit failed, mempool entry kept");
            return Err(ConsensusError::Commit(e));
        }

        self.metrics
            .record_block_committed(committed.attempts, committed.elapsed);
        info!(
            number = committed.number,
            hash = %hex::encode(committed.hash),
            attempts = committed.attempts,
            "Block committed"
        );
        Ok(CycleOutcome::Committed(committed))
    }

    /// Process entries until `cancel` fires or a fatal error occurs.
    #[instrument(skip(self, cancel), fields(chain_id = self.ctx.chain_id))]
    pub async fn run(&self, cancel: Cancellation) -> ConsensusResult<()> {
        // Subscribe before draining so nothing inserted meanwhile is missed.
        let mut insertions = self.store.subscribe_to_insertions(self.ctx.chain_id);
        info!("Consensus cycle started");

        let backoff = self.config.retry_backoff();
        let mut retry_at: Option<Instant> = None;

        if self.config.drain_backlog {
            match self.drain(&cancel).await? {
                Next::Stop => return Ok(()),
                Next::Retry => retry_at = Some(Instant::now() + backoff),
                Next::Continue => {}
            }
        }

        loop {
            self.enter(CycleState::WaitTx);
            let entry = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Consensus cycle stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    retry_at = None;
                    debug!("Re-reading mempool after missed mining deadline");
                    match self.drain(&cancel).await? {
                        Next::Stop => return Ok(()),
                        Next::Retry => retry_at = Some(Instant::now() + backoff),
                        Next::Continue => {}
                    }
                    continue;
                }
                entry = insertions.recv() => entry,
            };
            let Some(entry) = entry else {
                warn!("Insertion stream closed, consensus cycle stopping");
                return Ok(());
            };

            let missed = insertions.take_missed();
            if missed > 0 {
                warn!(missed, "Insertion notifications lost, re-reading mempool");
                match self.drain(&cancel).await? {
                    Next::Stop => return Ok(()),
                    Next::Retry => retry_at = retry_at.or(Some(Instant::now() + backoff)),
                    Next::Continue => {}
                }
            }

            let result = self.process(entry, &cancel).await;
            match self.settle(result, &cancel)? {
                Next::Stop => return Ok(()),
                Next::Retry => retry_at = retry_at.or(Some(Instant::now() + backoff)),
                Next::Continue => {}
            }
        }
    }

    /// Process every entry currently in the mempool, oldest first.
    async fn drain(&self, cancel: &Cancellation) -> ConsensusResult<Next> {
        let backlog = self.store.list_by_chain_id(self.ctx.chain_id).await?;
        if !backlog.is_empty() {
            info!(entries = backlog.len(), "Draining mempool backlog");
        }
        let mut next = Next::Continue;
        for entry in backlog {
            if cancel.is_cancelled() {
                return Ok(Next::Stop);
            }
            let result = self.process(entry, cancel).await;
            match self.settle(result, cancel)? {
                Next::Stop => return Ok(Next::Stop),
                Next::Retry => next = Next::Retry,
                Next::Continue => {}
            }
        }
        Ok(next)
    }

    fn settle(&self, result: ConsensusResult<CycleOutcome>, cancel: &Cancellation) -> ConsensusResult<Next> {
        let err = match result {
            Ok(_) => return Ok(Next::Continue),
            Err(err) => err,
        };

        match err {
            ConsensusError::Validation(e) => {
                self.metrics.record_rejection();
                if self.config.halt_on_validation_error {
                    error!(error = %e, "Transaction rejected, halting");
                    return Err(ConsensusError::Validation(e));
                }
                warn!(error = %e, "Transaction rejected, entry left in mempool");
                Ok(Next::Continue)
            }
            ConsensusError::MiningCancelled { .. } | ConsensusError::Cancelled if cancel.is_cancelled() => {
                Ok(Next::Stop)
            }
            ConsensusError::MiningCancelled { attempts } => {
                warn!(attempts, "Mining deadline passed, entry queued for retry");
                Ok(Next::Retry)
            }
            err if err.is_recoverable() => {
                warn!(error = %err, "Cycle failed, continuing");
                Ok(Next::Continue)
            }
            err => {
                error!(error = %err, "Consensus cycle halted");
                Err(err)
            }
        }
    }
}
