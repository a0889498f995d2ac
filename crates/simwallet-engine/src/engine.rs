//! Similar-wallet search and pairwise wallet comparison.
//!
//! [`SimilarityEngine`] is the boundary the CLI talks to. It validates
//! addresses before any provider call, fetches histories, drives neighborhood
//! expansion and the matcher, and ranks the result.

use std::collections::HashSet;
use std::sync::Arc;

use alloy::primitives::{Address, B256};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use simwallet_data::{
    format_address, parse_wallet_address, BlockSource, Error, RateLimited, RateLimiter, Result,
    Transaction, TransactionSource,
};

use crate::attestation::{address_digest, AttestationSigner};
use crate::config::CorrelationConfig;
use crate::matcher::{credit_neighborhood, match_pairwise, SimilarityMatch};
use crate::neighborhood::NeighborhoodExpander;
use crate::score::{rank_entries, score_from_count, RankedWallet, WalletScore};

/// Outcome of a similar-wallet search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SimilarWalletsReport {
    /// Normalized subject wallet.
    pub address: Address,
    /// Subject transactions whose neighborhood was scanned.
    pub transactions_scanned: usize,
    /// Wallets credited at least once before thresholding.
    pub candidates_scored: usize,
    /// Wallets at or above the threshold, best first.
    pub similar_wallets: Vec<RankedWallet>,
    /// Signature over the hashed subject address, only when no similar
    /// wallets were found and a signer is configured.
    pub attestation: Option<String>,
}

/// Correlation engine over a history provider and a block provider.
pub struct SimilarityEngine<T, B> {
    transactions: T,
    neighborhood: NeighborhoodExpander<RateLimited<B>>,
    config: CorrelationConfig,
    signer: Option<Arc<dyn AttestationSigner>>,
}

impl<T, B> SimilarityEngine<T, B>
where
    T: TransactionSource,
    B: BlockSource,
{
    /// Creates an engine whose block fetches are paced by a limiter built
    /// from `config.rate_limit`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if `config` fails validation.
    pub fn new(transactions: T, blocks: B, config: CorrelationConfig) -> Result<Self> {
        config.validate()?;
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max_requests,
            config.rate_limit.window(),
        ));
        Self::with_rate_limiter(transactions, blocks, config, limiter)
    }

    /// Creates an engine sharing `limiter` with other engines in the process.
    ///
    /// `config.rate_limit` is ignored in favor of the limiter's own cap.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if `config` fails validation or
    /// `config.batch_size` exceeds the limiter's cap.
    pub fn with_rate_limiter(
        transactions: T,
        blocks: B,
        config: CorrelationConfig,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        config.validate()?;
        if config.batch_size > limiter.max_requests() {
            return Err(Error::InvalidConfig(format!(
                "batch_size {} exceeds rate limit of {} requests",
                config.batch_size,
                limiter.max_requests()
            )));
        }

        Ok(Self {
            transactions,
            neighborhood: NeighborhoodExpander::new(RateLimited::new(blocks, limiter), &config),
            config,
            signer: None,
        })
    }

    /// Issues attestations with `signer` when a search finds nothing.
    pub fn with_attestation_signer(mut self, signer: Arc<dyn AttestationSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Limiter pacing block fetches.
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        self.neighborhood.source().limiter()
    }

    /// Active configuration.
    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    /// Ranks wallets whose transactions repeatedly land next to `address`'s.
    ///
    /// # Errors
    /// Returns [`simwallet_data::Error::InvalidInput`] for a malformed
    /// address and [`simwallet_data::Error::Provider`] if any history fetch
    /// fails. Block fetch failures only shrink the neighborhood.
    #[tracing::instrument(skip(self))]
    pub async fn compute_similar_wallets(&self, address: &str) -> Result<SimilarWalletsReport> {
        let subject = parse_wallet_address(address)?;
        let history = self.transactions.fetch_transactions(subject).await?;
        tracing::info!(
            address = %format_address(&subject),
            transactions = history.len(),
            "scanning wallet history"
        );

        let (scores, transactions_scanned) = self.scan(subject, &history).await;
        let mut similar_wallets = scores.rank(self.config.score_threshold);
        tracing::info!(
            candidates = scores.len(),
            above_threshold = similar_wallets.len(),
            threshold = self.config.score_threshold,
            "neighborhood scan complete"
        );

        if self.config.verify_pairwise && !similar_wallets.is_empty() {
            similar_wallets = self.verify_pairwise(&history, similar_wallets).await?;
        }

        let attestation = if similar_wallets.is_empty() {
            self.attest(subject).await
        } else {
            None
        };

        Ok(SimilarWalletsReport {
            address: subject,
            transactions_scanned,
            candidates_scored: scores.len(),
            similar_wallets,
            attestation,
        })
    }

    /// Lists transactions of `address_a` matched to transactions of
    /// `address_b`, sorted by timestamp.
    ///
    /// # Errors
    /// Returns [`simwallet_data::Error::InvalidInput`] if either address is
    /// malformed and [`simwallet_data::Error::Provider`] if either history
    /// fetch fails.
    #[tracing::instrument(skip(self))]
    pub async fn compare_wallets(
        &self,
        address_a: &str,
        address_b: &str,
    ) -> Result<Vec<SimilarityMatch>> {
        compare_histories(
            &self.transactions,
            address_a,
            address_b,
            self.config.match_tolerance_secs,
        )
        .await
    }

    /// Expands every subject transaction and credits neighborhood senders.
    ///
    /// Expansions run `expansion_concurrency` at a time but are consumed in
    /// history order, so crediting is the same as a sequential scan.
    async fn scan(&self, subject: Address, history: &[Transaction]) -> (WalletScore, usize) {
        let scannable: Vec<&Transaction> = history.iter().filter(|tx| tx.to.is_some()).collect();
        let mut used: HashSet<B256> = HashSet::new();
        let mut scores = WalletScore::new();

        let mut expansions = stream::iter(scannable.iter().copied())
            .map(|tx| async move {
                let neighborhood = self.neighborhood.expand(tx.block_number, tx.timestamp).await;
                (tx, neighborhood)
            })
            .buffered(self.config.expansion_concurrency);

        while let Some((tx, neighborhood)) = expansions.next().await {
            let credited = credit_neighborhood(tx, subject, &neighborhood, &mut used, &mut scores);
            tracing::trace!(
                block_number = tx.block_number,
                neighborhood = neighborhood.len(),
                credited = credited.is_some(),
                "subject transaction scanned"
            );
        }

        (scores, scannable.len())
    }

    /// Replaces neighborhood scores with exact pairwise match counts.
    async fn verify_pairwise(
        &self,
        subject_history: &[Transaction],
        candidates: Vec<RankedWallet>,
    ) -> Result<Vec<RankedWallet>> {
        let mut exact = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let history = self.transactions.fetch_transactions(candidate.address).await?;
            let count = score_from_count(
                match_pairwise(subject_history, &history, self.config.match_tolerance_secs).len(),
            );
            tracing::debug!(
                wallet = %format_address(&candidate.address),
                neighborhood_score = candidate.score,
                pairwise_score = count,
                "candidate verified"
            );
            exact.push((candidate.address, count));
        }
        Ok(rank_entries(exact, self.config.score_threshold))
    }

    async fn attest(&self, subject: Address) -> Option<String> {
        let signer = self.signer.as_ref()?;
        match signer.sign_digest(address_digest(&subject)).await {
            Ok(signature) => Some(signature),
            Err(e) => {
                tracing::warn!(error = %e, "attestation signing failed");
                None
            }
        }
    }
}

/// Fetches both histories from `source` and matches A against B.
///
/// Usable without a block source, since pairwise comparison never expands
/// neighborhoods.
///
/// # Errors
/// Same as [`SimilarityEngine::compare_wallets`].
pub async fn compare_histories<T: TransactionSource>(
    source: &T,
    address_a: &str,
    address_b: &str,
    tolerance_secs: u64,
) -> Result<Vec<SimilarityMatch>> {
    let wallet_a = parse_wallet_address(address_a)?;
    let wallet_b = parse_wallet_address(address_b)?;

    let (history_a, history_b) = futures::try_join!(
        source.fetch_transactions(wallet_a),
        source.fetch_transactions(wallet_b),
    )?;

    let matches = match_pairwise(&history_a, &history_b, tolerance_secs);
    tracing::info!(
        wallet_a = %format_address(&wallet_a),
        wallet_b = %format_address(&wallet_b),
        wallet_a_txs = history_a.len(),
        wallet_b_txs = history_b.len(),
        matches = matches.len(),
        "wallet comparison complete"
    );
    Ok(matches)
}
