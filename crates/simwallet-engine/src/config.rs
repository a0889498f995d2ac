//! Tuning knobs for similarity search and pairwise comparison.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use simwallet_data::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
use simwallet_data::{Error, Result};

/// Default block radius searched around each subject transaction.
pub const DEFAULT_RADIUS_BLOCKS: u64 = 30;

/// Default tolerance between a neighborhood block and the subject transaction.
pub const DEFAULT_TIME_TOLERANCE_SECS: u64 = 60;

/// Default tolerance between two matched transactions in pairwise mode.
pub const DEFAULT_MATCH_TOLERANCE_SECS: u64 = 60;

/// Default minimum score for a wallet to be reported.
pub const DEFAULT_SCORE_THRESHOLD: u32 = 10;

/// Largest accepted block radius.
pub const MAX_RADIUS_BLOCKS: u64 = 10_000;

/// Default number of subject transactions expanded at the same time.
pub const DEFAULT_EXPANSION_CONCURRENCY: usize = 4;

/// Block RPC rate limit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum block requests per window.
    pub max_requests: usize,
    /// Window length in milliseconds.
    pub per_millis: u64,
}

impl RateLimitConfig {
    /// Window as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.per_millis)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            per_millis: DEFAULT_WINDOW.as_millis() as u64,
        }
    }
}

/// Configuration of the correlation engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Blocks searched on each side of a subject transaction (W).
    pub radius_blocks: u64,
    /// Max distance in seconds between a neighborhood block and the subject
    /// transaction (T).
    pub time_tolerance_secs: u64,
    /// Max distance in seconds between two transactions matched pairwise.
    pub match_tolerance_secs: u64,
    /// Minimum score reported in the ranking.
    pub score_threshold: u32,
    /// Block requests issued concurrently per expansion batch.
    pub batch_size: usize,
    /// Subject transactions expanded concurrently.
    pub expansion_concurrency: usize,
    /// Re-score surviving candidates with the pairwise matcher.
    pub verify_pairwise: bool,
    /// Block RPC rate limit, shared process-wide.
    pub rate_limit: RateLimitConfig,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            radius_blocks: DEFAULT_RADIUS_BLOCKS,
            time_tolerance_secs: DEFAULT_TIME_TOLERANCE_SECS,
            match_tolerance_secs: DEFAULT_MATCH_TOLERANCE_SECS,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            batch_size: DEFAULT_MAX_REQUESTS,
            expansion_concurrency: DEFAULT_EXPANSION_CONCURRENCY,
            verify_pairwise: false,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl CorrelationConfig {
    /// Checks that the configuration can drive a scan.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.radius_blocks > MAX_RADIUS_BLOCKS {
            return Err(Error::InvalidConfig(format!(
                "radius_blocks {} exceeds maximum of {MAX_RADIUS_BLOCKS}",
                self.radius_blocks
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.expansion_concurrency == 0 {
            return Err(Error::InvalidConfig(
                "expansion_concurrency must be at least 1".into(),
            ));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(Error::InvalidConfig(
                "rate_limit.max_requests must be at least 1".into(),
            ));
        }
        if self.rate_limit.per_millis == 0 {
            return Err(Error::InvalidConfig(
                "rate_limit.per_millis must be positive".into(),
            ));
        }
        if self.batch_size > self.rate_limit.max_requests {
            return Err(Error::InvalidConfig(format!(
                "batch_size {} exceeds rate_limit.max_requests {}",
                self.batch_size, self.rate_limit.max_requests
            )));
        }
        Ok(())
    }
}
