//! Shared test helpers and utilities.
//!
//! In-memory history and block providers plus factories for transactions on a
//! synthetic chain with 12-second blocks.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::{address, Address, Bytes, B256, U256};
use async_trait::async_trait;
use simwallet_data::{
    format_address, Block, BlockSource, Error, Result, Transaction, TransactionSource,
};
use simwallet_engine::attestation::AttestationSigner;
use tokio::time::Instant;

pub const SUBJECT: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
pub const WALLET_A: Address = address!("000000000000000000000000000000000000000a");
pub const WALLET_B: Address = address!("000000000000000000000000000000000000000b");
pub const WALLET_C: Address = address!("000000000000000000000000000000000000000c");
pub const CONTRACT: Address = address!("5300000000000000000000000000000000000004");

/// Well-known development key (anvil/hardhat account #0).
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Timestamp of block `number` on the synthetic chain.
pub fn block_time(number: u64) -> u64 {
    1_000 + number * 12
}

/// Creates a transaction mined in `block_number` with the block's timestamp.
///
/// `id` must be unique per test; it becomes the transaction hash.
pub fn sample_tx(id: u64, from: Address, to: Address, block_number: u64) -> Transaction {
    Transaction {
        block_number,
        timestamp: block_time(block_number),
        from,
        to: Some(to),
        hash: B256::left_padding_from(&id.to_be_bytes()),
        value: U256::from(id),
        input: Bytes::from_static(&[0xa9, 0x05, 0x9c, 0xbb]),
    }
}

/// Creates a transaction with an explicit timestamp, for pairwise tests.
pub fn timed_tx(id: u64, from: Address, to: Address, timestamp: u64) -> Transaction {
    Transaction {
        block_number: timestamp / 12,
        timestamp,
        ..sample_tx(id, from, to, 0)
    }
}

/// Wallet histories keyed by address.
#[derive(Default)]
pub struct FakeHistories {
    histories: HashMap<Address, Vec<Transaction>>,
    failing: HashSet<Address>,
    calls: AtomicUsize,
}

impl FakeHistories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `txs` to each sender's history.
    pub fn with_transactions(mut self, txs: &[Transaction]) -> Self {
        for tx in txs {
            self.histories.entry(tx.from).or_default().push(tx.clone());
        }
        self
    }

    /// Replaces `wallet`'s history.
    pub fn with_history(mut self, wallet: Address, txs: Vec<Transaction>) -> Self {
        self.histories.insert(wallet, txs);
        self
    }

    /// Makes every fetch of `wallet` fail.
    pub fn failing(mut self, wallet: Address) -> Self {
        self.failing.insert(wallet);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSource for FakeHistories {
    async fn fetch_transactions(&self, address: Address) -> Result<Vec<Transaction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&address) {
            return Err(Error::Provider {
                address: format_address(&address),
                reason: "explorer returned HTTP 503".to_string(),
            });
        }
        let mut txs = self.histories.get(&address).cloned().unwrap_or_default();
        txs.sort_by_key(|tx| tx.block_number);
        Ok(txs)
    }
}

/// Synthetic chain: every block exists, holding whichever transactions were
/// registered for it.
#[derive(Default)]
pub struct FakeBlocks {
    transactions: HashMap<u64, Vec<Transaction>>,
    failing: HashSet<u64>,
    requests: Mutex<Vec<(u64, Instant)>>,
}

impl FakeBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transactions(mut self, txs: &[Transaction]) -> Self {
        for tx in txs {
            self.transactions
                .entry(tx.block_number)
                .or_default()
                .push(tx.clone());
        }
        self
    }

    /// Makes every fetch of `block_number` fail.
    pub fn failing(mut self, block_number: u64) -> Self {
        self.failing.insert(block_number);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }

    /// Instants at which blocks were requested, in request order.
    pub fn request_instants(&self) -> Vec<Instant> {
        self.requests
            .lock()
            .expect("lock")
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl BlockSource for FakeBlocks {
    async fn fetch_block(&self, block_number: u64) -> Option<Block> {
        self.requests
            .lock()
            .expect("lock")
            .push((block_number, Instant::now()));
        if self.failing.contains(&block_number) {
            return None;
        }
        Some(Block {
            number: block_number,
            timestamp: block_time(block_number),
            transactions: self
                .transactions
                .get(&block_number)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

/// Signer that always fails.
pub struct BrokenSigner;

#[async_trait]
impl AttestationSigner for BrokenSigner {
    async fn sign_digest(&self, _digest: B256) -> Result<String> {
        Err(Error::Attestation("hardware wallet disconnected".to_string()))
    }
}
