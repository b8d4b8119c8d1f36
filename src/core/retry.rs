use crate::utils::error::Result;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

/// Exponential backoff applied to rate-limited model calls only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait before the attempt following `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }

    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            tracing::info!(
                "🔁 Calling model (attempt {}/{})",
                attempt + 1,
                max_attempts
            );

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            tracing::warn!("Attempt {} failed: {}", attempt + 1, err);

            if !err.is_rate_limited() {
                tracing::error!("Non-retryable error occurred: {}", err);
                return Err(err);
            }
            if attempt + 1 >= max_attempts {
                tracing::error!("All {} attempts failed due to rate limiting", max_attempts);
                return Err(err);
            }

            let wait = self.delay_for(attempt);
            tracing::info!("Rate limit exceeded. Waiting {:?} before retry...", wait);
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}
