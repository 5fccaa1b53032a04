//! # End-to-End Scenarios
//!
//! Requester → mempool → consensus cycle → committed block, checked
//! through the stores.

#[cfg(test)]
mod tests {
    use crate::harness::{key, TestChain, CHAIN_ID};
    use pc_02_chain_storage::{MempoolStore, TokenStore};
    use pc_08_consensus::{ChainAuditor, ConsensusError, CycleOutcome, ValidationError};
    use pc_17_block_production::MerkleTree;
    use shared_crypto::verify_block_signature;
    use shared_types::{Account, Token, Transaction, U256};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_coin_transfer_to_new_account() {
        let a = key(1);
        let chain = TestChain::new(&[Account::new(a.address(), 100)]).await;
        chain.keyring.insert(a.clone());
        let b = [0xB0; 20];
        let before = chain.head().await;

        chain
            .coin_requester()
            .transfer(a.address(), b, 40)
            .await
            .unwrap();
        let outcomes = chain.process_pending().await;
        assert!(matches!(outcomes.as_slice(), [Ok(CycleOutcome::Committed(_))]));

        let sender = chain.account(&a.address()).await.unwrap();
        assert_eq!(sender.balance, 60);
        assert_eq!(sender.nonce, U256::one());
        let recipient = chain.account(&b).await.unwrap();
        assert_eq!(recipient.balance, 40);
        assert_eq!(recipient.nonce, U256::zero());

        let head = chain.head().await;
        let block = chain.head_block().await;
        assert_eq!(block.header.number, before.latest_block_number + 1);
        assert_eq!(head.latest_hash, block.hash);
        assert_eq!(block.header.prev_block_hash, before.latest_hash);
        assert!(block.verify_integrity().is_ok());
        verify_block_signature(&block).unwrap();
        assert!(chain.store.list_by_chain_id(CHAIN_ID).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mint_after_latest_token_five() {
        let chain = TestChain::new(&[]).await;
        chain.set_latest_token_id(5).await;

        let token_id = chain.token_requester().mint("ipfs://x").await.unwrap();
        assert_eq!(token_id, 6);
        let outcomes = chain.process_pending().await;
        assert!(matches!(outcomes.as_slice(), [Ok(CycleOutcome::Committed(_))]));

        let token = chain.token(6).await.unwrap();
        assert_eq!(token.nonce, U256::zero());
        assert_eq!(token.metadata_uri, "ipfs://x");
        assert_eq!(token.owner, chain.authority.address());
        assert_eq!(chain.head().await.latest_token_id, 6);
    }

    #[tokio::test]
    async fn test_token_transfer_by_non_owner_changes_nothing() {
        let b = key(2);
        let c = key(3);
        let chain = TestChain::new(&[Account::new(b.address(), 0), Account::new(c.address(), 0)]).await;
        chain
            .seed_token(Token {
                id: 9,
                owner: b.address(),
                metadata_uri: "ipfs://b".into(),
                nonce: U256::from(1),
            })
            .await;
        let before = chain.head().await;

        let entry = chain
            .submit(
                c.sign_transaction(Transaction::token(
                    CHAIN_ID,
                    U256::zero(),
                    c.address(),
                    [0xD0; 20],
                    9,
                    "",
                    U256::from(2),
                ))
                .unwrap(),
            )
            .await;

        let outcomes = chain.process_pending().await;
        assert!(matches!(
            outcomes.as_slice(),
            [Err(ConsensusError::Validation(ValidationError::NotTokenOwner { token_id: 9, .. }))]
        ));

        assert_eq!(chain.token(9).await.unwrap().owner, b.address());
        assert_eq!(chain.head().await, before);
        assert!(chain.store.get(&entry.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mint_then_transfer_through_requesters() {
        let chain = TestChain::new(&[]).await;
        let recipient = chain.user(7, 0).await;
        let requester = chain.token_requester();

        let token_id = requester.mint("ipfs://art").await.unwrap();
        chain.process_pending().await;
        requester
            .transfer(token_id, chain.authority.address(), recipient.address())
            .await
            .unwrap();
        chain.process_pending().await;

        let token = chain.store.get_by_id(token_id).await.unwrap().unwrap();
        assert_eq!(token.owner, recipient.address());
        assert_eq!(token.nonce, U256::one());
        assert_eq!(token.metadata_uri, "ipfs://art");
        assert_eq!(chain.head().await.latest_block_number, 2);
    }

    #[tokio::test]
    async fn test_committed_chain_audits_clean_and_proves_inclusion() {
        let a = key(1);
        let chain = TestChain::new(&[Account::new(a.address(), 100)]).await;
        chain.keyring.insert(a.clone());
        let coins = chain.coin_requester();
        for _ in 0..3 {
            coins.transfer(a.address(), [0xB0; 20], 10).await.unwrap();
        }
        let outcomes = chain.process_pending().await;
        assert!(outcomes.iter().all(|o| matches!(o, Ok(CycleOutcome::Committed(_)))));

        let report = ChainAuditor::new(chain.store.clone())
            .verify_range(CHAIN_ID, 0, 3)
            .await
            .unwrap();
        assert_eq!(report.checked, 4);
        assert!(report.is_clean(), "{:?}", report.findings);

        let block = chain.head_block().await;
        let tree = MerkleTree::from_transactions(&block.transactions).unwrap();
        assert_eq!(tree.root(), block.header.trans_root);
        let proof = tree.generate_proof(0).unwrap();
        assert!(MerkleTree::verify_proof_static(
            &proof.leaf_hash,
            &proof.path,
            &block.header.trans_root
        ));
        assert_eq!(chain.account(&a.address()).await.unwrap().balance, 70);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_loop_commits_queued_requests() {
        let a = key(1);
        let chain = Arc::new(TestChain::new(&[Account::new(a.address(), 50)]).await);
        chain.keyring.insert(a.clone());
        let (handle, token) = shared_types::cancellation();

        let runner = chain.clone();
        let task = tokio::spawn(async move { runner.cycle.run(token).await });

        let coins = chain.coin_requester();
        coins.transfer(a.address(), [0xB0; 20], 5).await.unwrap();
        coins.transfer(a.address(), [0xB1; 20], 5).await.unwrap();

        let metrics = chain.cycle.metrics();
        tokio::time::timeout(std::time::Duration::from_secs(10), async {
            while metrics.get_blocks_committed() < 2 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("two blocks committed");

        handle.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(chain.account(&a.address()).await.unwrap().balance, 40);
        assert_eq!(chain.head().await.latest_block_number, 2);
    }
}
