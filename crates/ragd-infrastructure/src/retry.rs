//! Retry with exponential backoff.
//!
//! Stateless policy `{max_retries, base, factor, cap, jitter}` applied
//! around idempotent operations (HTTP GET, store ping). Embedding and LLM
//! calls are deliberately not wrapped here to avoid duplicated billable
//! work.

use std::time::Duration;

use rand::Rng;

/// Backoff policy for retryable operations
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first (total attempts = `max_retries + 1`)
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Exponential growth factor
    pub factor: f64,
    /// Apply ±20% jitter when true
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy with a custom retry count and default shape.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), jittered.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.factor.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let mut delay = self.base_delay.as_secs_f64() * exp;
        delay = delay.min(self.max_delay.as_secs_f64());
        if self.jitter {
            let factor = rand::rng().random_range(0.8..=1.2);
            delay = (delay * factor).min(self.max_delay.as_secs_f64() * 1.2);
        }
        Duration::from_secs_f64(delay)
    }

    /// Run `op` until it succeeds, retries are exhausted, or a
    /// non-retryable error occurs.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `op`.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, mut retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnMut(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(attempt, "retry succeeded");
                    }
                    return Ok(value);
                }
                Err(error) if attempt < self.max_retries && retryable(&error) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "attempt failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    if attempt >= self.max_retries && retryable(&error) {
                        tracing::error!(attempts = attempt + 1, error = %error, "all attempts failed");
                    }
                    return Err(error);
                }
            }
        }
    }
}
