//! # Subsystem Container
//!
//! Builds every component from a validated `NodeConfig` and shares one
//! store, one key provider and one `ChainContext` between them.
//!
//! ## Initialization Order
//!
//! 1. Keystore and authority key
//! 2. Chain context derived from the authority key
//! 3. Chain storage
//! 4. Consensus cycle
//! 5. Requesters

use super::config::NodeConfig;
use anyhow::{Context, Result};
use pc_02_chain_storage::{ChainStore, InMemoryChainStore};
use pc_06_mempool::{CoinRequester, MempoolSubmitter, TokenRequester};
use pc_08_consensus::ConsensusCycle;
use shared_crypto::{FileKeyProvider, KeyProvider, Secp256k1KeyPair};
use shared_types::ChainContext;
use std::sync::Arc;
use tracing::{info, warn};

/// All node components, wired and ready to start.
pub struct SubsystemContainer {
    /// Validated configuration the container was built from.
    pub config: NodeConfig,
    /// Chain id and authority identity.
    pub ctx: ChainContext,
    /// Unsealed authority key.
    pub authority_key: Secp256k1KeyPair,
    /// Chain storage shared by all components.
    pub store: Arc<InMemoryChainStore>,
    /// Keystore-backed key lookup.
    pub keys: Arc<dyn KeyProvider>,
    /// The single chain-state writer.
    pub cycle: Arc<ConsensusCycle>,
    /// Mint and token transfer requests.
    pub tokens: Arc<TokenRequester>,
    /// Coin transfer requests.
    pub coins: Arc<CoinRequester>,
    /// Admission of externally signed transactions.
    pub submitter: Arc<MempoolSubmitter>,
}

impl SubsystemContainer {
    /// Create the container.
    ///
    /// `config` must have passed `NodeConfig::validate`.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let password = config
            .keystore
            .password
            .clone()
            .context("Keystore password is not set")?;
        let provider = Arc::new(
            FileKeyProvider::new(config.keystore.dir.clone(), password)
                .with_kdf_params(config.keystore.kdf),
        );
        let authority_key = load_authority_key(&provider, &config)?;

        let ctx = ChainContext {
            chain_id: config.consensus.chain_id,
            authority: authority_key.validator(config.consensus.validator_id.clone()),
            authority_address: authority_key.address(),
        };
        info!(
            chain_id = ctx.chain_id,
            authority = %format!("0x{}", hex::encode(ctx.authority_address)),
            "Chain context ready"
        );

        let store = Arc::new(InMemoryChainStore::default());
        let shared: Arc<dyn ChainStore> = store.clone();
        let keys: Arc<dyn KeyProvider> = provider;

        let cycle = ConsensusCycle::new(
            shared.clone(),
            keys.clone(),
            ctx.clone(),
            config.consensus.clone(),
        )
        .context("Failed to create consensus cycle")?;

        let tokens = TokenRequester::new(shared.clone(), keys.clone(), ctx.clone());
        let coins = CoinRequester::new(shared.clone(), keys.clone(), ctx.clone());
        let submitter = MempoolSubmitter::new(shared, ctx.chain_id);

        Ok(Self {
            config,
            ctx,
            authority_key,
            store,
            keys,
            cycle: Arc::new(cycle),
            tokens: Arc::new(tokens),
            coins: Arc::new(coins),
            submitter: Arc::new(submitter),
        })
    }
}

/// Unseal the configured authority key, or generate one into the keystore.
fn load_authority_key(provider: &FileKeyProvider, config: &NodeConfig) -> Result<Secp256k1KeyPair> {
    match config.keystore.authority_address {
        Some(address) => provider.key_for(&address).with_context(|| {
            format!(
                "Failed to unseal authority key 0x{} from {}",
                hex::encode(address),
                config.keystore.dir.display()
            )
        }),
        None => {
            let key = Secp256k1KeyPair::generate();
            let address = provider
                .import(&key)
                .context("Failed to write generated authority key")?;
            warn!(
                authority = %format!("0x{}", hex::encode(address)),
                "POA_AUTHORITY_ADDRESS not set, generated a new authority key"
            );
            Ok(key)
        }
    }
}
