//! # Cross-Crate Properties
//!
//! Signing against recovery, and determinism of the hashes that end up in
//! block headers.

#[cfg(test)]
mod tests {
    use crate::harness::CHAIN_ID;
    use pc_08_consensus::resolve_token;
    use pc_17_block_production::{hash_accounts, hash_tokens, BlockAssembler, MerkleTree, MiningConfig};
    use proptest::prelude::*;
    use shared_crypto::{recover_signer, verify_signature, Secp256k1KeyPair};
    use shared_types::{Account, BlockTransaction, Token, Transaction, U256};

    fn keypair(secret: [u8; 32]) -> Option<Secp256k1KeyPair> {
        Secp256k1KeyPair::from_bytes(secret).ok()
    }

    fn signed_transfers(values: &[u64]) -> Vec<BlockTransaction> {
        let mut secret = [0u8; 32];
        secret[31] = 9;
        let key = Secp256k1KeyPair::from_bytes(secret).unwrap();
        let assembler = BlockAssembler::new(MiningConfig::default()).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let signed = key
                    .sign_transaction(Transaction::coin(
                        CHAIN_ID,
                        U256::from(i as u64),
                        key.address(),
                        [0xB0; 20],
                        *value,
                    ))
                    .unwrap();
                assembler.block_transaction(signed, 1_700_000_000)
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_signature_round_trip(
            secret in prop::array::uniform32(1u8..0x80),
            nonce in any::<u64>(),
            to in prop::array::uniform20(any::<u8>()),
            value in any::<u64>(),
        ) {
            let Some(key) = keypair(secret) else { return Ok(()); };
            let signed = key
                .sign_transaction(Transaction::coin(CHAIN_ID, U256::from(nonce), key.address(), to, value))
                .unwrap();

            prop_assert_eq!(verify_signature(&signed).unwrap(), key.address());
            prop_assert_eq!(recover_signer(&signed).unwrap(), key.address());
        }

        #[test]
        fn prop_account_hash_ignores_store_order(
            accounts in prop::collection::vec(
                (prop::array::uniform20(any::<u8>()), any::<u64>()),
                1..24,
            ).prop_map(|rows| {
                let mut unique = std::collections::BTreeMap::new();
                for (address, balance) in rows {
                    unique.insert(address, balance);
                }
                unique
                    .into_iter()
                    .map(|(address, balance)| Account::new(address, balance))
                    .collect::<Vec<_>>()
            }).prop_shuffle(),
        ) {
            let mut sorted = accounts.clone();
            sorted.sort_by(|a, b| a.address.cmp(&b.address));
            prop_assert_eq!(hash_accounts(&accounts).unwrap(), hash_accounts(&sorted).unwrap());
        }

        #[test]
        fn prop_token_hash_ignores_store_order(
            tokens in prop::collection::btree_set(any::<u64>(), 1..16)
                .prop_map(|ids| ids
                    .into_iter()
                    .map(|id| Token {
                        id,
                        owner: [(id % 251) as u8; 20],
                        metadata_uri: format!("ipfs://{id}"),
                        nonce: U256::from(id % 7),
                    })
                    .collect::<Vec<_>>())
                .prop_shuffle(),
        ) {
            let mut sorted = tokens.clone();
            sorted.sort_by_key(|t| t.id);
            prop_assert_eq!(hash_tokens(&tokens).unwrap(), hash_tokens(&sorted).unwrap());
        }

        #[test]
        fn prop_merkle_root_is_deterministic(values in prop::collection::vec(any::<u64>(), 0..12)) {
            let first = MerkleTree::from_transactions(&signed_transfers(&values)).unwrap();
            let second = MerkleTree::from_transactions(&signed_transfers(&values)).unwrap();
            prop_assert_eq!(first.root(), second.root());

            for index in 0..values.len() {
                let proof = first.generate_proof(index).unwrap();
                prop_assert!(MerkleTree::verify_proof_static(&proof.leaf_hash, &proof.path, &first.root()));
            }
        }

        #[test]
        fn prop_highest_token_nonce_wins(
            current in 0u64..100,
            updates in prop::collection::vec(0u64..100, 1..6).prop_shuffle(),
        ) {
            let token = |nonce: u64| Token {
                id: 1,
                owner: [nonce as u8; 20],
                metadata_uri: "ipfs://x".into(),
                nonce: U256::from(nonce),
            };

            let mut stored = token(current);
            for nonce in &updates {
                if let Some(next) = resolve_token(Some(&stored), token(*nonce)) {
                    stored = next;
                }
            }

            let expected = updates.iter().copied().chain([current]).max().unwrap();
            prop_assert_eq!(stored.nonce, U256::from(expected));
        }
    }

    #[test]
    fn test_reordered_transactions_change_the_root() {
        let forward = signed_transfers(&[1, 2, 3]);
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_ne!(
            MerkleTree::from_transactions(&forward).unwrap().root(),
            MerkleTree::from_transactions(&reversed).unwrap().root()
        );
    }
}
