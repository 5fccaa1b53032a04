//! # Commit Atomicity and Replay
//!
//! Fault injection on the chain-state write, replayed signed transactions,
//! and conflicting token updates arriving in either order.

#[cfg(test)]
mod tests {
    use crate::harness::{key, TestChain, CHAIN_ID};
    use pc_02_chain_storage::{AccountStore, BlockStore, MempoolStore, WriteKind};
    use pc_08_consensus::{ConsensusError, CycleOutcome, ValidationError};
    use shared_types::{Account, Token, Transaction, U256};

    #[tokio::test]
    async fn test_failed_head_update_leaves_no_partial_state() {
        let a = key(1);
        let chain = TestChain::new(&[Account::new(a.address(), 100)]).await;
        let entry = chain
            .submit(
                a.sign_transaction(Transaction::coin(CHAIN_ID, U256::zero(), a.address(), [0xB0; 20], 40))
                    .unwrap(),
            )
            .await;
        let before = chain.head().await;

        chain.store.inject_fault(WriteKind::ChainState);
        let outcomes = chain.process_pending().await;
        assert!(matches!(outcomes.as_slice(), [Err(ConsensusError::Commit(_))]));

        assert_eq!(chain.head().await, before);
        assert_eq!(chain.account(&a.address()).await.unwrap().balance, 100);
        assert!(chain.account(&[0xB0; 20]).await.is_none());
        assert!(chain.store.list_in_between(CHAIN_ID, 1, 1).await.unwrap().is_empty());
        assert!(chain.store.get(&entry.id).await.unwrap().is_some());
        assert_eq!(chain.cycle.metrics().snapshot().commit_failures, 1);

        chain.store.clear_faults();
        let outcomes = chain.process_pending().await;
        assert!(matches!(outcomes.as_slice(), [Ok(CycleOutcome::Committed(_))]));
        assert_eq!(chain.account(&a.address()).await.unwrap().balance, 60);
        assert_eq!(chain.head().await.latest_block_number, 1);
        assert_eq!(chain.store.mempool_len(), 0);
    }

    #[tokio::test]
    async fn test_failed_mempool_delete_rolls_back_block() {
        let a = key(1);
        let chain = TestChain::new(&[Account::new(a.address(), 100)]).await;
        chain
            .submit(
                a.sign_transaction(Transaction::coin(CHAIN_ID, U256::zero(), a.address(), [0xB0; 20], 1))
                    .unwrap(),
            )
            .await;
        let before = chain.head().await;

        chain.store.inject_fault(WriteKind::Mempool);
        let outcomes = chain.process_pending().await;
        assert!(matches!(outcomes.as_slice(), [Err(ConsensusError::Commit(_))]));
        assert_eq!(chain.head().await, before);
        assert_eq!(chain.account(&a.address()).await.unwrap().nonce, U256::zero());
        assert_eq!(chain.store.mempool_len(), 1);
    }

    #[tokio::test]
    async fn test_replayed_transaction_applies_once() {
        let a = key(1);
        let chain = TestChain::new(&[Account::new(a.address(), 100)]).await;
        let signed = a
            .sign_transaction(Transaction::coin(CHAIN_ID, U256::zero(), a.address(), [0xB0; 20], 30))
            .unwrap();

        chain.submit(signed.clone()).await;
        chain.process_pending().await;
        let replay = chain.submit(signed).await;
        let outcomes = chain.process_pending().await;

        assert!(matches!(
            outcomes.as_slice(),
            [Err(ConsensusError::Validation(ValidationError::StaleNonce { .. }))]
        ));
        assert_eq!(chain.account(&a.address()).await.unwrap().balance, 70);
        assert_eq!(chain.account(&[0xB0; 20]).await.unwrap().balance, 30);
        assert_eq!(chain.head().await.latest_block_number, 1);
        assert!(chain.store.get(&replay.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_future_nonce_replay_applies_once() {
        let a = key(1);
        let chain = TestChain::new(&[Account::new(a.address(), 100)]).await;
        let signed = a
            .sign_transaction(Transaction::coin(CHAIN_ID, U256::from(5), a.address(), [0xB0; 20], 30))
            .unwrap();

        let mut committed = 0;
        for _ in 0..3 {
            chain.submit(signed.clone()).await;
            for outcome in chain.process_pending().await {
                match outcome {
                    Ok(CycleOutcome::Committed(_)) => committed += 1,
                    Err(ConsensusError::Validation(ValidationError::StaleNonce { .. })) => {}
                    other => panic!("unexpected outcome {other:?}"),
                }
            }
        }

        assert_eq!(committed, 1);
        let sender = chain.account(&a.address()).await.unwrap();
        assert_eq!(sender.balance, 70);
        assert_eq!(sender.nonce, U256::from(6));
        assert_eq!(chain.account(&[0xB0; 20]).await.unwrap().balance, 30);
        assert_eq!(chain.head().await.latest_block_number, 1);
    }

    #[tokio::test]
    async fn test_replayed_token_transfer_is_a_no_op() {
        let chain = TestChain::new(&[]).await;
        let recipient = chain.user(7, 0).await;
        let authority = chain.authority.clone();
        chain
            .seed_token(Token {
                id: 3,
                owner: authority.address(),
                metadata_uri: "ipfs://t".into(),
                nonce: U256::zero(),
            })
            .await;
        let signed = authority
            .sign_transaction(Transaction::token(
                CHAIN_ID,
                U256::zero(),
                authority.address(),
                recipient.address(),
                3,
                "",
                U256::one(),
            ))
            .unwrap();

        chain.submit(signed.clone()).await;
        let outcomes = chain.process_pending().await;
        assert!(matches!(outcomes.as_slice(), [Ok(CycleOutcome::Committed(_))]));
        let after_first = chain.head().await;
        let moved = chain.token(3).await.unwrap();

        let replay = chain.submit(signed).await;
        let outcomes = chain.process_pending().await;
        assert!(matches!(
            outcomes.as_slice(),
            [Err(ConsensusError::Validation(ValidationError::NotTokenOwner { token_id: 3, .. }))]
        ));
        assert_eq!(chain.token(3).await.unwrap(), moved);
        assert_eq!(moved.owner, recipient.address());
        assert_eq!(chain.head().await, after_first);
        assert_eq!(
            chain.account(&authority.address()).await.unwrap().nonce,
            U256::zero()
        );
        assert!(chain.store.get(&replay.id).await.unwrap().is_some());
    }

    async fn token_race(order: [u64; 2]) -> Token {
        let chain = TestChain::new(&[]).await;
        let authority = chain.authority.clone();
        chain
            .seed_token(Token {
                id: 9,
                owner: authority.address(),
                metadata_uri: "ipfs://t".into(),
                nonce: U256::from(3),
            })
            .await;

        for token_nonce in order {
            let recipient = [token_nonce as u8; 20];
            AccountStore::upsert(&*chain.store, Account::new(recipient, 0)).await.unwrap();
            chain
                .submit(
                    authority
                        .sign_transaction(Transaction::token(
                            CHAIN_ID,
                            U256::zero(),
                            authority.address(),
                            recipient,
                            9,
                            "",
                            U256::from(token_nonce),
                        ))
                        .unwrap(),
                )
                .await;
        }
        chain.process_pending().await;
        chain.token(9).await.unwrap()
    }

    #[tokio::test]
    async fn test_token_nonce_tie_break_in_either_order() {
        for order in [[2, 4], [4, 2]] {
            let token = token_race(order).await;
            assert_eq!(token.nonce, U256::from(4), "order {order:?}");
            assert_eq!(token.owner, [4u8; 20], "order {order:?}");
            assert_eq!(token.metadata_uri, "ipfs://t");
        }
    }
}
