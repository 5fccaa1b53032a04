//! # Test Harness
//!
//! A genesis-bootstrapped chain over the in-memory store, an in-memory
//! keyring holding the authority key, and a consensus cycle driven one
//! entry at a time.

use pc_02_chain_storage::{
    AccountStore, BlockStore, ChainStateStore, ChainStore, InMemoryChainStore, MempoolStore,
    TokenStore,
};
use pc_06_mempool::{CoinRequester, TokenRequester};
use pc_08_consensus::{
    bootstrap_genesis, ConsensusConfig, ConsensusCycle, ConsensusResult, CycleOutcome,
};
use pc_17_block_production::MiningConfig;
use shared_crypto::{InMemoryKeyring, KeyProvider, Secp256k1KeyPair};
use shared_types::{
    unix_millis, unix_seconds, Account, Address, BlockData, BlockchainState, Cancellation,
    ChainContext, ChainId, MempoolTransaction, SignedTransaction, Token, TokenId,
};
use std::sync::Arc;

/// Chain id used by every scenario.
pub const CHAIN_ID: ChainId = 1;

/// Deterministic key: 31 zero bytes followed by `seed`.
pub fn key(seed: u8) -> Secp256k1KeyPair {
    let mut bytes = [0u8; 32];
    bytes[31] = seed;
    Secp256k1KeyPair::from_bytes(bytes).expect("seed yields a valid scalar")
}

/// Fast-mining consensus settings.
pub fn consensus_config() -> ConsensusConfig {
    ConsensusConfig {
        chain_id: CHAIN_ID,
        mining: MiningConfig {
            difficulty: 1,
            ..MiningConfig::default()
        },
        ..ConsensusConfig::default()
    }
}

/// A running single-authority chain.
pub struct TestChain {
    pub store: Arc<InMemoryChainStore>,
    pub keyring: Arc<InMemoryKeyring>,
    pub authority: Secp256k1KeyPair,
    pub ctx: ChainContext,
    pub cycle: ConsensusCycle,
}

impl TestChain {
    /// Genesis with the authority (balance 0) plus `allocations`.
    pub async fn new(allocations: &[Account]) -> Self {
        Self::with_config(allocations, consensus_config()).await
    }

    pub async fn with_config(allocations: &[Account], config: ConsensusConfig) -> Self {
        let authority = key(100);
        let ctx = ChainContext {
            chain_id: CHAIN_ID,
            authority: authority.validator("authority"),
            authority_address: authority.address(),
        };
        let store = Arc::new(InMemoryChainStore::default());
        let keyring = Arc::new(InMemoryKeyring::new());
        keyring.insert(authority.clone());

        let mut accounts = vec![Account::new(authority.address(), 0)];
        accounts.extend_from_slice(allocations);
        bootstrap_genesis(&*store, &authority, &ctx, &config.mining, &accounts, unix_seconds())
            .await
            .expect("genesis");

        let shared: Arc<dyn ChainStore> = store.clone();
        let keys: Arc<dyn KeyProvider> = keyring.clone();
        let cycle = ConsensusCycle::new(shared, keys, ctx.clone(), config).expect("cycle");

        Self {
            store,
            keyring,
            authority,
            ctx,
            cycle,
        }
    }

    pub fn shared_store(&self) -> Arc<dyn ChainStore> {
        self.store.clone()
    }

    pub fn keys(&self) -> Arc<dyn KeyProvider> {
        self.keyring.clone()
    }

    pub fn coin_requester(&self) -> CoinRequester {
        CoinRequester::new(self.shared_store(), self.keys(), self.ctx.clone())
    }

    pub fn token_requester(&self) -> TokenRequester {
        TokenRequester::new(self.shared_store(), self.keys(), self.ctx.clone())
    }

    /// Key `seed` added to the keyring, with its account funded in place.
    pub async fn user(&self, seed: u8, balance: u64) -> Secp256k1KeyPair {
        let user = key(seed);
        self.keyring.insert(user.clone());
        AccountStore::upsert(&*self.store, Account::new(user.address(), balance))
            .await
            .expect("seed account");
        user
    }

    pub async fn seed_token(&self, token: Token) {
        TokenStore::upsert(&*self.store, token).await.expect("seed token");
    }

    pub async fn set_latest_token_id(&self, id: TokenId) {
        let mut state = self.head().await;
        state.latest_token_id = id;
        ChainStateStore::upsert(&*self.store, state).await.expect("seed head");
    }

    /// Queue an already signed transaction.
    pub async fn submit(&self, signed: SignedTransaction) -> MempoolTransaction {
        let entry = MempoolTransaction::new(signed, unix_millis());
        MempoolStore::insert(&*self.store, entry.clone()).await.expect("enqueue");
        entry
    }

    /// Run every queued entry through the cycle, oldest first.
    pub async fn process_pending(&self) -> Vec<ConsensusResult<CycleOutcome>> {
        let entries = self.store.list_by_chain_id(CHAIN_ID).await.expect("list mempool");
        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            outcomes.push(self.cycle.process(entry, &Cancellation::never()).await);
        }
        outcomes
    }

    pub async fn head(&self) -> BlockchainState {
        self.store
            .get_by_chain_id(CHAIN_ID)
            .await
            .expect("read head")
            .expect("chain initialized")
    }

    pub async fn head_block(&self) -> BlockData {
        let head = self.head().await;
        self.store
            .get_by_hash(&head.latest_hash)
            .await
            .expect("read block")
            .expect("head block stored")
    }

    pub async fn account(&self, address: &Address) -> Option<Account> {
        self.store.get_by_address(address).await.expect("read account")
    }

    pub async fn token(&self, id: TokenId) -> Option<Token> {
        self.store.get_by_id(id).await.expect("read token")
    }
}
