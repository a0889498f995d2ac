//! Candidate wallet tallies and their final ranking.

use std::collections::HashMap;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// A candidate wallet that survived the threshold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedWallet {
    /// Candidate wallet.
    pub address: Address,
    /// Correlated transaction count.
    pub score: u32,
}

/// Running tally of correlated transactions per candidate wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletScore {
    counts: HashMap<Address, u32>,
}

impl WalletScore {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one correlated transaction for `wallet` and returns its new score.
    pub fn credit(&mut self, wallet: Address) -> u32 {
        let count = self.counts.entry(wallet).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Current score of `wallet`, zero if never credited.
    pub fn get(&self, wallet: &Address) -> u32 {
        self.counts.get(wallet).copied().unwrap_or(0)
    }

    /// Number of wallets with a non-zero score.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// True if nothing was credited.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterates over `(wallet, score)` in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &u32)> {
        self.counts.iter()
    }

    /// Drops wallets scoring below `threshold` and sorts the rest descending.
    pub fn rank(&self, threshold: u32) -> Vec<RankedWallet> {
        rank_entries(
            self.counts.iter().map(|(address, score)| (*address, *score)),
            threshold,
        )
    }
}

impl FromIterator<(Address, u32)> for WalletScore {
    fn from_iter<I: IntoIterator<Item = (Address, u32)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

/// Converts a match count to a score, saturating at `u32::MAX`.
pub fn score_from_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Filters `entries` to `score >= threshold`, sorted by score descending.
///
/// Equal scores are ordered by address so the output is deterministic.
pub fn rank_entries(
    entries: impl IntoIterator<Item = (Address, u32)>,
    threshold: u32,
) -> Vec<RankedWallet> {
    let mut ranked: Vec<RankedWallet> = entries
        .into_iter()
        .filter(|(_, score)| *score >= threshold)
        .map(|(address, score)| RankedWallet { address, score })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.address.cmp(&b.address)));
    ranked
}
