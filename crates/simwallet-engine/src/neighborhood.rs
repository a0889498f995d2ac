//! Block neighborhood around a subject transaction.
//!
//! Candidate blocks are `n - W ..= n + W` (clamped at zero). They are fetched
//! in batches: each batch is issued concurrently and fully awaited before the
//! next one starts. Pacing between batches comes from the shared
//! [`simwallet_data::RateLimiter`] wrapped around the block source, so no
//! delay is paid after the last batch.

use std::ops::RangeInclusive;

use futures::future::join_all;
use simwallet_data::{BlockSource, Transaction};

use crate::config::CorrelationConfig;

/// Collects transactions from blocks near a reference block and timestamp.
pub struct NeighborhoodExpander<B> {
    source: B,
    radius_blocks: u64,
    time_tolerance_secs: u64,
    batch_size: usize,
}

impl<B: BlockSource> NeighborhoodExpander<B> {
    /// Creates an expander over `source` using the radius, tolerance and
    /// batch size from `config`.
    pub fn new(source: B, config: &CorrelationConfig) -> Self {
        Self {
            source,
            radius_blocks: config.radius_blocks,
            time_tolerance_secs: config.time_tolerance_secs,
            batch_size: config.batch_size.max(1),
        }
    }

    /// Underlying block source.
    pub fn source(&self) -> &B {
        &self.source
    }

    /// Block numbers considered around `block_number`.
    pub fn candidate_blocks(&self, block_number: u64) -> RangeInclusive<u64> {
        block_number.saturating_sub(self.radius_blocks)
            ..=block_number.saturating_add(self.radius_blocks)
    }

    /// Returns the transactions of every candidate block whose timestamp is
    /// within the tolerance of `timestamp`, flattened in block order.
    ///
    /// Blocks that cannot be fetched are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn expand(&self, block_number: u64, timestamp: u64) -> Vec<Transaction> {
        let candidates: Vec<u64> = self.candidate_blocks(block_number).collect();
        let mut transactions = Vec::new();
        let mut missing = 0usize;
        let mut in_window = 0usize;

        for batch in candidates.chunks(self.batch_size) {
            let blocks = join_all(batch.iter().map(|&n| self.source.fetch_block(n))).await;

            for (number, block) in batch.iter().zip(blocks) {
                let Some(block) = block else {
                    tracing::debug!(block_number = number, "skipping absent block");
                    missing += 1;
                    continue;
                };
                if block.timestamp.abs_diff(timestamp) <= self.time_tolerance_secs {
                    in_window += 1;
                    transactions.extend(block.transactions);
                }
            }
        }

        tracing::debug!(
            requested = candidates.len(),
            missing,
            in_window,
            transactions = transactions.len(),
            "neighborhood expanded"
        );
        transactions
    }
}
