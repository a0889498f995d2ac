//! Provider seams consumed by the correlation engine.
//!
//! The engine only talks to these traits; [`crate::explorer::ExplorerClient`]
//! and [`crate::blocks::RpcBlockClient`] are the HTTP implementations.

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Block, Transaction};

/// Source of a wallet's full transaction history.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Returns every transaction involving `address`, ascending by block number.
    ///
    /// # Errors
    /// Returns [`crate::Error::Provider`] if the upstream call fails or the
    /// payload is not a success response.
    async fn fetch_transactions(&self, address: Address) -> Result<Vec<Transaction>>;
}

/// Source of full blocks.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Returns the block with all transactions, or `None` when the block is
    /// missing or could not be fetched.
    async fn fetch_block(&self, block_number: u64) -> Option<Block>;
}

#[async_trait]
impl<T: TransactionSource + ?Sized> TransactionSource for Arc<T> {
    async fn fetch_transactions(&self, address: Address) -> Result<Vec<Transaction>> {
        (**self).fetch_transactions(address).await
    }
}

#[async_trait]
impl<T: BlockSource + ?Sized> BlockSource for Arc<T> {
    async fn fetch_block(&self, block_number: u64) -> Option<Block> {
        (**self).fetch_block(block_number).await
    }
}
