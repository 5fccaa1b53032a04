//! # PoA-Chain Block Production Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | pc-17 Merkle Builder | root over N block transactions |
//! | pc-17 State Hasher | account-set hash over N accounts |
//! | pc-17 Difficulty Miner | nonce search at difficulty 1-3 |
//! | shared-crypto | sign + recover one transaction |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pc_17_block_production::{
    hash_accounts, BlockAssembler, DifficultyMiner, MerkleTree, MiningConfig,
};
use shared_crypto::{verify_signature, Secp256k1KeyPair};
use shared_types::{Account, BlockTransaction, Cancellation, Transaction, U256};
use std::time::Duration;

fn key() -> Secp256k1KeyPair {
    let mut secret = [0u8; 32];
    secret[31] = 7;
    Secp256k1KeyPair::from_bytes(secret).unwrap()
}

fn block_transactions(count: usize) -> Vec<BlockTransaction> {
    let key = key();
    let assembler = BlockAssembler::new(MiningConfig::default()).unwrap();
    (0..count)
        .map(|i| {
            let tx = Transaction::coin(1, U256::from(i as u64), key.address(), [0xB0; 20], i as u64);
            assembler.block_transaction(key.sign_transaction(tx).unwrap(), 1_700_000_000)
        })
        .collect()
}

fn bench_merkle_root(c: &mut Criterion) {
    let mut group = c.benchmark_group("pc-17-merkle");
    for size in [1usize, 16, 256] {
        let transactions = block_transactions(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("root", size), &transactions, |b, txs| {
            b.iter(|| black_box(MerkleTree::from_transactions(txs).unwrap().root()))
        });
    }
    group.finish();
}

fn bench_state_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("pc-17-state-hash");
    for size in [100usize, 10_000] {
        let accounts: Vec<Account> = (0..size)
            .map(|i| {
                let mut address = [0u8; 20];
                address[..8].copy_from_slice(&(i as u64).to_be_bytes());
                Account::new(address, i as u64)
            })
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("accounts", size), &accounts, |b, accounts| {
            b.iter(|| black_box(hash_accounts(accounts).unwrap()))
        });
    }
    group.finish();
}

fn bench_mining(c: &mut Criterion) {
    let mut group = c.benchmark_group("pc-17-mining");
    group.measurement_time(Duration::from_secs(10));
    let assembler = BlockAssembler::new(MiningConfig::default()).unwrap();
    let miner = DifficultyMiner::new(&MiningConfig::default());
    let cancel = Cancellation::never();

    for difficulty in [1u16, 2, 3] {
        let mut template = assembler.genesis_header(1, key().address(), [1; 32], [2; 32], 1_700_000_000);
        template.number = 1;
        template.difficulty = difficulty;
        group.bench_with_input(BenchmarkId::new("difficulty", difficulty), &template, |b, template| {
            b.iter(|| {
                let mut header = template.clone();
                black_box(miner.mine(&mut header, &cancel).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_signatures(c: &mut Criterion) {
    let key = key();
    let tx = Transaction::coin(1, U256::zero(), key.address(), [0xB0; 20], 40);
    let signed = key.sign_transaction(tx.clone()).unwrap();

    let mut group = c.benchmark_group("shared-crypto-ecdsa");
    group.bench_function("sign_transaction", |b| {
        b.iter(|| black_box(key.sign_transaction(tx.clone()).unwrap()))
    });
    group.bench_function("verify_signature", |b| {
        b.iter(|| black_box(verify_signature(&signed).unwrap()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_merkle_root,
    bench_state_hash,
    bench_mining,
    bench_signatures
);
criterion_main!(benches);
