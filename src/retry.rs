//! Retries for transient portal failures: network errors, 5xx and rate limits.

use crate::error::ScrapeError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    base: Duration,
    cap: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_ms: u64, max_ms: u64) -> Self {
        Self {
            max_retries,
            base: Duration::from_millis(base_ms),
            cap: Duration::from_millis(max_ms.max(base_ms)),
        }
    }

    /// Same waits, but a single attempt. Used for requests that must not be resent.
    pub fn once(self) -> Self {
        Self { max_retries: 0, ..self }
    }

    /// Wait before retry number `attempt` (0-based).
    ///
    /// Doubles from the base up to the cap, then adds up to a quarter of that
    /// on top so parallel scrapers do not retry in lockstep.
    pub fn wait(&self, attempt: u32) -> Duration {
        let wait = self.base.saturating_mul(1 << attempt.min(16)).min(self.cap);
        let spread = wait.as_millis() as u64 / 4;
        if spread == 0 {
            return wait;
        }
        wait + Duration::from_millis(rand::rng().random_range(0..=spread))
    }

    /// Runs `op` until it succeeds, fails with a fatal error, or the retries
    /// are spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ScrapeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let wait = self.wait(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {}ms",
                        what,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
