use super::*;
use crate::config::ConsensusConfig;
use crate::domain::{ConsensusError, ResourceLocks, StateError, ValidationError};
use pc_02_chain_storage::{
    AccountStore, BlockStore, ChainStateStore, ChainStore, InMemoryChainStore, MempoolStore,
    TokenStore, WriteKind,
};
use pc_17_block_production::{hash_accounts, MiningConfig};
use shared_crypto::{verify_block_signature, InMemoryKeyring, KeyProvider, Secp256k1KeyPair};
use shared_types::{
    cancellation, unix_millis, unix_seconds, Account, Address, Cancellation, ChainContext,
    MempoolTransaction, SignedTransaction, Token, Transaction, U256,
};
use std::sync::Arc;
use std::time::Duration;

const CHAIN_ID: u64 = 1;

fn key(seed: u8) -> Secp256k1KeyPair {
    let mut bytes = [0u8; 32];
    bytes[31] = seed;
    Secp256k1KeyPair::from_bytes(bytes).unwrap()
}

fn config() -> ConsensusConfig {
    ConsensusConfig {
        chain_id: CHAIN_ID,
        mining: MiningConfig {
            difficulty: 1,
            ..MiningConfig::default()
        },
        ..ConsensusConfig::default()
    }
}

struct Fixture {
    store: Arc<InMemoryChainStore>,
    keys: Arc<InMemoryKeyring>,
    authority: Secp256k1KeyPair,
    ctx: ChainContext,
}

impl Fixture {
    async fn new(allocations: &[Account]) -> Self {
        let authority = key(100);
        let ctx = ChainContext {
            chain_id: CHAIN_ID,
            authority: authority.validator("authority"),
            authority_address: authority.address(),
        };
        let store = Arc::new(InMemoryChainStore::default());
        let keys = Arc::new(InMemoryKeyring::new());
        keys.insert(authority.clone());

        let mut accounts = vec![Account::new(authority.address(), 0)];
        accounts.extend_from_slice(allocations);
        bootstrap_genesis(&*store, &authority, &ctx, &config().mining, &accounts, unix_seconds())
            .await
            .unwrap();

        Self {
            store,
            keys,
            authority,
            ctx,
        }
    }

    fn cycle_with(&self, config: ConsensusConfig) -> ConsensusCycle {
        let store: Arc<dyn ChainStore> = self.store.clone();
        let keys: Arc<dyn KeyProvider> = self.keys.clone();
        ConsensusCycle::new(store, keys, self.ctx.clone(), config).unwrap()
    }

    fn cycle(&self) -> ConsensusCycle {
        self.cycle_with(config())
    }

    async fn submit(&self, signed: SignedTransaction) -> MempoolTransaction {
        let entry = MempoolTransaction::new(signed, unix_millis());
        MempoolStore::insert(&*self.store, entry.clone()).await.unwrap();
        entry
    }

    async fn account(&self, address: &Address) -> Option<Account> {
        self.store.get_by_address(address).await.unwrap()
    }

    async fn head(&self) -> shared_types::BlockchainState {
        self.store.get_by_chain_id(CHAIN_ID).await.unwrap().unwrap()
    }
}

fn coin(from: &Secp256k1KeyPair, to: Address, nonce: u64, value: u64) -> SignedTransaction {
    from.sign_transaction(Transaction::coin(CHAIN_ID, U256::from(nonce), from.address(), to, value))
        .unwrap()
}

fn committed(outcome: CycleOutcome) -> CommittedBlock {
    match outcome {
        CycleOutcome::Committed(block) => block,
        other => panic!("expected a committed block, got {other:?}"),
    }
}

async fn wait_for_blocks(cycle: &ConsensusCycle, count: u64) {
    let metrics = cycle.metrics();
    tokio::time::timeout(Duration::from_secs(10), async {
        while metrics.get_blocks_committed() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("blocks were not committed in time");
}

#[tokio::test]
async fn test_coin_transfer_to_new_account() {
    let a = key(1);
    let b: Address = [0xB0; 20];
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    let genesis = fx.head().await;
    let entry = fx.submit(coin(&a, b, 0, 40)).await;

    let block = committed(fx.cycle().process(entry, &Cancellation::never()).await.unwrap());

    let sender = fx.account(&a.address()).await.unwrap();
    assert_eq!(sender.balance, 60);
    assert_eq!(sender.nonce, U256::one());
    let recipient = fx.account(&b).await.unwrap();
    assert_eq!(recipient.balance, 40);
    assert_eq!(recipient.nonce, U256::zero());

    let head = fx.head().await;
    assert_eq!(block.number, genesis.latest_block_number + 1);
    assert_eq!(head.latest_hash, block.hash);
    assert_eq!(head.latest_block_number, 1);
    assert_eq!(fx.store.mempool_len(), 0);

    let stored = fx.store.get_by_hash(&block.hash).await.unwrap().unwrap();
    assert_eq!(stored.header.prev_block_hash, genesis.latest_hash);
    assert_eq!(stored.header.state_root, head.account_hash_state);
    assert_eq!(stored.transactions.len(), 1);
    verify_block_signature(&stored).unwrap();

    let all = AccountStore::list_all(&*fx.store).await.unwrap();
    assert_eq!(hash_accounts(&all).unwrap(), head.account_hash_state);
}

#[tokio::test]
async fn test_mint_allocates_next_token_id() {
    let fx = Fixture::new(&[]).await;
    let mint = fx
        .authority
        .sign_transaction(Transaction::token(
            CHAIN_ID,
            U256::zero(),
            fx.authority.address(),
            fx.authority.address(),
            1,
            "ipfs://x",
            U256::zero(),
        ))
        .unwrap();
    let entry = fx.submit(mint).await;

    committed(fx.cycle().process(entry, &Cancellation::never()).await.unwrap());

    let token = fx.store.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(token.owner, fx.authority.address());
    assert_eq!(token.nonce, U256::zero());
    assert_eq!(fx.head().await.latest_token_id, 1);
}

#[tokio::test]
async fn test_not_token_owner_leaves_everything_in_place() {
    let b = key(2);
    let c = key(3);
    let fx = Fixture::new(&[Account::new(b.address(), 0), Account::new(c.address(), 0)]).await;
    TokenStore::upsert(
        &*fx.store,
        Token {
            id: 4,
            owner: b.address(),
            metadata_uri: "ipfs://x".into(),
            nonce: U256::zero(),
        },
    )
    .await
    .unwrap();
    let before = fx.head().await;

    let theft = c
        .sign_transaction(Transaction::token(
            CHAIN_ID,
            U256::zero(),
            c.address(),
            c.address().map(|x| x ^ 1),
            4,
            "ipfs://x",
            U256::one(),
        ))
        .unwrap();
    let entry = fx.submit(theft).await;

    let err = fx.cycle().process(entry.clone(), &Cancellation::never()).await.unwrap_err();
    assert!(matches!(
        err,
        ConsensusError::Validation(ValidationError::NotTokenOwner { token_id: 4, .. })
    ));

    assert_eq!(fx.head().await, before);
    assert_eq!(fx.store.get_by_id(4).await.unwrap().unwrap().owner, b.address());
    assert!(fx.store.get(&entry.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_failed_commit_writes_nothing() {
    let a = key(1);
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    let before = fx.head().await;
    let entry = fx.submit(coin(&a, [0xB0; 20], 0, 40)).await;
    let cycle = fx.cycle();

    fx.store.inject_fault(WriteKind::ChainState);
    let err = cycle.process(entry.clone(), &Cancellation::never()).await.unwrap_err();
    assert!(matches!(err, ConsensusError::Commit(_)));
    assert!(err.is_fatal());

    assert_eq!(fx.head().await, before);
    assert!(fx.store.list_in_between(CHAIN_ID, 1, 1).await.unwrap().is_empty());
    assert_eq!(fx.account(&a.address()).await.unwrap().balance, 100);
    assert!(fx.account(&[0xB0; 20]).await.is_none());
    assert!(fx.store.get(&entry.id).await.unwrap().is_some());
    assert_eq!(cycle.metrics().snapshot().commit_failures, 1);

    // Retry once the store recovers.
    fx.store.clear_faults();
    committed(cycle.process(entry, &Cancellation::never()).await.unwrap());
    assert_eq!(fx.account(&a.address()).await.unwrap().balance, 60);
}

#[tokio::test]
async fn test_replayed_transaction_applied_once() {
    let a = key(1);
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    let signed = coin(&a, [0xB0; 20], 0, 40);
    let first = fx.submit(signed.clone()).await;
    let replay = fx.submit(signed).await;
    let cycle = fx.cycle();

    committed(cycle.process(first, &Cancellation::never()).await.unwrap());
    let err = cycle.process(replay, &Cancellation::never()).await.unwrap_err();
    assert!(matches!(
        err,
        ConsensusError::Validation(ValidationError::StaleNonce { .. })
    ));
    assert_eq!(fx.account(&a.address()).await.unwrap().balance, 60);
    assert_eq!(fx.account(&[0xB0; 20]).await.unwrap().balance, 40);
}

#[tokio::test]
async fn test_consumed_entry_is_skipped() {
    let a = key(1);
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    let entry = fx.submit(coin(&a, [0xB0; 20], 0, 1)).await;
    let cycle = fx.cycle();

    committed(cycle.process(entry.clone(), &Cancellation::never()).await.unwrap());
    let again = cycle.process(entry.clone(), &Cancellation::never()).await.unwrap();
    assert_eq!(again, CycleOutcome::Skipped { mempool_id: entry.id });
    assert_eq!(fx.head().await.latest_block_number, 1);
}

#[tokio::test]
async fn test_missing_chain_state_is_fatal() {
    let a = key(1);
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    let other = ChainContext {
        chain_id: 2,
        ..fx.ctx.clone()
    };
    let store: Arc<dyn ChainStore> = fx.store.clone();
    let cycle = ConsensusCycle::new(
        store,
        fx.keys.clone(),
        other,
        ConsensusConfig {
            chain_id: 2,
            ..config()
        },
    )
    .unwrap();

    let signed = a
        .sign_transaction(Transaction::coin(2, U256::zero(), a.address(), [0xB0; 20], 1))
        .unwrap();
    let entry = fx.submit(signed).await;
    let err = cycle.process(entry, &Cancellation::never()).await.unwrap_err();
    assert!(matches!(
        err,
        ConsensusError::State(StateError::MissingChainState { chain_id: 2 })
    ));
}

#[tokio::test]
async fn test_missing_authority_key_is_fatal() {
    let a = key(1);
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    let store: Arc<dyn ChainStore> = fx.store.clone();
    let cycle = ConsensusCycle::new(store, Arc::new(InMemoryKeyring::new()), fx.ctx.clone(), config()).unwrap();

    let entry = fx.submit(coin(&a, [0xB0; 20], 0, 1)).await;
    let err = cycle.process(entry.clone(), &Cancellation::never()).await.unwrap_err();
    assert!(matches!(
        err,
        ConsensusError::State(StateError::MissingAuthorityKey { .. })
    ));
    assert!(fx.store.get(&entry.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_mining_deadline_keeps_entry() {
    let a = key(1);
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    let mut slow = config();
    slow.mining.difficulty = 64;
    slow.mining_timeout_ms = 20;
    let cycle = fx.cycle_with(slow);

    let entry = fx.submit(coin(&a, [0xB0; 20], 0, 1)).await;
    let err = cycle.process(entry.clone(), &Cancellation::never()).await.unwrap_err();
    assert!(matches!(err, ConsensusError::MiningCancelled { .. }));
    assert!(fx.store.get(&entry.id).await.unwrap().is_some());
    assert_eq!(cycle.state(), CycleState::WaitTx);
    assert_eq!(cycle.metrics().snapshot().mining_cancellations, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_drains_backlog_then_follows_insertions() {
    let a = key(1);
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    fx.submit(coin(&a, [0xB0; 20], 0, 10)).await;

    let cycle = Arc::new(fx.cycle());
    let (handle, token) = cancellation();
    let task = tokio::spawn({
        let cycle = cycle.clone();
        async move { cycle.run(token).await }
    });

    wait_for_blocks(&cycle, 1).await;
    fx.submit(coin(&a, [0xB1; 20], 1, 10)).await;
    wait_for_blocks(&cycle, 2).await;

    handle.cancel();
    task.await.unwrap().unwrap();

    assert_eq!(fx.head().await.latest_block_number, 2);
    assert_eq!(fx.account(&a.address()).await.unwrap().balance, 80);
    assert_eq!(fx.store.mempool_len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_skips_rejected_entries_by_default() {
    let a = key(1);
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    let bad = fx.submit(coin(&a, [0xB0; 20], 0, 1_000)).await;
    fx.submit(coin(&a, [0xB0; 20], 0, 10)).await;

    let cycle = Arc::new(fx.cycle());
    let (handle, token) = cancellation();
    let task = tokio::spawn({
        let cycle = cycle.clone();
        async move { cycle.run(token).await }
    });

    wait_for_blocks(&cycle, 1).await;
    handle.cancel();
    task.await.unwrap().unwrap();

    assert_eq!(cycle.metrics().snapshot().validation_rejections, 1);
    assert!(fx.store.get(&bad.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_run_halts_on_rejection_when_configured() {
    let a = key(1);
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    fx.submit(coin(&a, [0xB0; 20], 0, 1_000)).await;

    let cycle = fx.cycle_with(ConsensusConfig {
        halt_on_validation_error: true,
        ..config()
    });
    let err = cycle.run(Cancellation::never()).await.unwrap_err();
    assert!(matches!(
        err,
        ConsensusError::Validation(ValidationError::InsufficientBalance { .. })
    ));
}

#[tokio::test]
async fn test_run_returns_when_cancelled() {
    let fx = Fixture::new(&[]).await;
    let (handle, token) = cancellation();
    handle.cancel();
    fx.cycle().run(token).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cycles_sharing_locks_build_one_chain() {
    let a = key(1);
    let b = key(2);
    let fx = Fixture::new(&[Account::new(a.address(), 100), Account::new(b.address(), 100)]).await;
    let locks = Arc::new(ResourceLocks::new());
    let first = fx.cycle().with_locks(locks.clone());
    let second = fx.cycle().with_locks(locks);

    let ea = fx.submit(coin(&a, [0xC0; 20], 0, 5)).await;
    let eb = fx.submit(coin(&b, [0xC1; 20], 0, 7)).await;
    let never = Cancellation::never();
    let (ra, rb) = tokio::join!(first.process(ea, &never), second.process(eb, &never));
    let mut numbers = vec![committed(ra.unwrap()).number, committed(rb.unwrap()).number];
    numbers.sort_unstable();
    assert_eq!(numbers, vec![1, 2]);

    let report = ChainAuditor::new(fx.store.clone()).verify_range(CHAIN_ID, 1, 2).await.unwrap();
    assert!(report.is_clean(), "{:?}", report.findings);
    assert_eq!(report.checked, 2);
}

#[tokio::test]
async fn test_auditor_flags_tampered_blocks() {
    let a = key(1);
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    let cycle = fx.cycle();
    let entry = fx.submit(coin(&a, [0xB0; 20], 0, 1)).await;
    let block = committed(cycle.process(entry, &Cancellation::never()).await.unwrap());

    let auditor = ChainAuditor::new(fx.store.clone());
    let clean = auditor.verify_range(CHAIN_ID, 0, 1).await.unwrap();
    assert!(clean.is_clean(), "{:?}", clean.findings);
    assert_eq!(clean.checked, 2);

    let mut tampered = fx.store.get_by_hash(&block.hash).await.unwrap().unwrap();
    tampered.header_signature = key(7).sign_header(&tampered.header).unwrap();
    tampered.transactions.clear();
    BlockStore::upsert(&*fx.store, tampered).await.unwrap();

    let report = auditor.verify_range(CHAIN_ID, 1, 1).await.unwrap();
    let issues: Vec<_> = report.findings.iter().map(|f| &f.issue).collect();
    assert!(issues.iter().any(|i| matches!(i, AuditIssue::BadSignature(_))));
    assert!(issues.contains(&&AuditIssue::TransRootMismatch));
}

#[tokio::test]
async fn test_process_uses_the_stored_row() {
    let a = key(1);
    let b: Address = [0xB0; 20];
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    let original = fx.submit(coin(&a, b, 0, 10)).await;
    let replacement = MempoolTransaction {
        signed: coin(&a, b, 0, 50),
        ..original.clone()
    };
    MempoolStore::upsert(&*fx.store, replacement).await.unwrap();

    committed(fx.cycle().process(original, &Cancellation::never()).await.unwrap());

    assert_eq!(fx.account(&b).await.unwrap().balance, 50);
    assert_eq!(fx.account(&a.address()).await.unwrap().balance, 50);
    assert_eq!(fx.store.mempool_len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_retries_entry_after_missed_deadline() {
    let a = key(1);
    let fx = Fixture::new(&[Account::new(a.address(), 100)]).await;
    let entry = fx.submit(coin(&a, [0xB0; 20], 0, 10)).await;

    let cycle = Arc::new(fx.cycle_with(ConsensusConfig {
        retry_backoff_ms: 20,
        ..config()
    }));
    // An already expired deadline cancels mining before the first hash.
    cycle.set_mining_timeout(Some(Duration::ZERO));
    let (handle, token) = cancellation();
    let task = tokio::spawn({
        let cycle = cycle.clone();
        async move { cycle.run(token).await }
    });

    let metrics = cycle.metrics();
    tokio::time::timeout(Duration::from_secs(10), async {
        while metrics.snapshot().mining_cancellations < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("mining was not cancelled in time");
    assert_eq!(metrics.get_blocks_committed(), 0);
    assert!(fx.store.get(&entry.id).await.unwrap().is_some());

    cycle.set_mining_timeout(None);
    wait_for_blocks(&cycle, 1).await;

    handle.cancel();
    task.await.unwrap().unwrap();
    assert_eq!(fx.head().await.latest_block_number, 1);
    assert_eq!(fx.account(&a.address()).await.unwrap().balance, 90);
    assert_eq!(fx.store.mempool_len(), 0);
}
