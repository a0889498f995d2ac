//! Process-wide request throttle for the block RPC endpoint.
//!
//! One [`RateLimiter`] is built per process and shared by `Arc` between every
//! neighborhood expansion, so the aggregate call rate stays under the
//! provider cap no matter how many scans run at once.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::provider::BlockSource;
use crate::types::Block;

/// Default maximum number of requests per window.
pub const DEFAULT_MAX_REQUESTS: usize = 30;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Sliding-log limiter: at most `max_requests` acquisitions in any `window`.
///
/// A burst of `max_requests` callers goes through immediately, which is how a
/// batch of concurrent block fetches gets issued; the next batch waits until
/// the oldest request of the previous one leaves the window.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    /// Issue instants of requests still inside the window, oldest first.
    issued: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_requests` per `window`.
    ///
    /// A zero `max_requests` is treated as one.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            window,
            issued: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Maximum number of requests per window.
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Waits until one more request fits in the window, then records it.
    pub async fn acquire(&self) {
        loop {
            let deadline = {
                let mut issued = self.issued.lock().await;
                let now = Instant::now();
                while let Some(&oldest) = issued.front() {
                    if now.duration_since(oldest) >= self.window {
                        issued.pop_front();
                    } else {
                        break;
                    }
                }

                if issued.len() < self.max_requests {
                    issued.push_back(now);
                    return;
                }

                issued[0] + self.window
            };

            tracing::trace!(
                wait_ms = deadline
                    .saturating_duration_since(Instant::now())
                    .as_millis() as u64,
                "rate limit reached, waiting for next window"
            );
            tokio::time::sleep_until(deadline).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

/// Block source decorator that takes a limiter slot before every fetch.
pub struct RateLimited<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
}

impl<S> RateLimited<S> {
    /// Wraps `inner` so every fetch goes through `limiter`.
    pub fn new(inner: S, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }

    /// Shared limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

#[async_trait]
impl<S: BlockSource> BlockSource for RateLimited<S> {
    async fn fetch_block(&self, block_number: u64) -> Option<Block> {
        self.limiter.acquire().await;
        self.inner.fetch_block(block_number).await
    }
}
