//! Bounded retry with exponential backoff.
//!
//! The control plane retries exactly one class of operation: reaching
//! Postgres. At boot that covers the window where the database container
//! comes up after the API does; at runtime a dropped connection gets the
//! same treatment. Domain-level operations are never retried here — the
//! port allocator owns its own conflict-retry policy, and the adapters
//! surface failures raw.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff policy: how often, how fast, and whether to spread attempts.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts after the first failure
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,

    /// Ceiling the exponential growth stops at, in milliseconds
    pub max_delay_ms: u64,

    /// Growth factor between attempts
    pub backoff_multiplier: f64,

    /// Spread attempts across 50-100% of the computed delay so replicas
    /// restarting together do not reconnect together
    pub use_jitter: bool,
}

impl RetryConfig {
    /// The defaults: 3 retries, 100 ms initial delay doubling up to 5 s,
    /// jitter on.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    pub fn with_max_delay(mut self, delay_ms: u64) -> Self {
        self.max_delay_ms = delay_ms;
        self
    }

    /// Deterministic delays, for tests that assert on timing.
    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

/// Runs `operation` until it succeeds or the retry budget is spent.
/// Returns the final error untouched; callers decide what a permanently
/// unreachable database means for them.
///
/// # Example
/// ```ignore
/// use database::common::retry::{retry_with_backoff, RetryConfig};
///
/// let config = RetryConfig::new().with_max_retries(5);
/// let db = retry_with_backoff(|| connect_with_options(options.clone()), config).await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, config: RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("Operation succeeded after {} retries", attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    warn!(
                        "Operation failed after {} attempts: {}",
                        config.max_retries, e
                    );
                    return Err(e);
                }

                let current_delay = if config.use_jitter {
                    apply_jitter(delay)
                } else {
                    delay
                };

                debug!(
                    "Operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                    attempt, config.max_retries, e, current_delay
                );

                tokio::time::sleep(Duration::from_millis(current_delay)).await;

                delay =
                    ((delay as f64 * config.backoff_multiplier) as u64).min(config.max_delay_ms);
            }
        }
    }
}

/// 50-100% of the nominal delay, seeded from the clock so no RNG crate
/// is needed for a once-per-boot code path.
fn apply_jitter(delay: u64) -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let random_factor =
        (RandomState::new().hash_one(std::time::SystemTime::now()) % 50) as f64 / 100.0 + 0.5;

    (delay as f64 * random_factor) as u64
}

/// `retry_with_backoff` under the default policy.
pub async fn retry<F, Fut, T, E>(operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff(operation, RetryConfig::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_failures(
        counter: Arc<AtomicU32>,
        succeed_after: u32,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<&'static str, String>> + Send>> {
        move || {
            let counter = counter.clone();
            Box::pin(async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                if attempt < succeed_after {
                    Err(format!("connection refused (attempt {})", attempt + 1))
                } else {
                    Ok("connected")
                }
            })
        }
    }

    #[tokio::test]
    async fn first_success_means_no_retry() {
        let counter = Arc::new(AtomicU32::new(0));
        let result = retry(counting_failures(counter.clone(), 0)).await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_within_the_retry_budget() {
        let counter = Arc::new(AtomicU32::new(0));
        let config = RetryConfig::new().with_initial_delay(10).without_jitter();

        let result = retry_with_backoff(counting_failures(counter.clone(), 2), config).await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_returns_the_last_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let config = RetryConfig::new()
            .with_max_retries(2)
            .with_initial_delay(10)
            .without_jitter();

        let result = retry_with_backoff(counting_failures(counter.clone(), u32::MAX), config).await;

        assert!(result.unwrap_err().contains("connection refused"));
        assert_eq!(counter.load(Ordering::SeqCst), 3); // 1 initial + 2 retries
    }

    #[tokio::test]
    async fn delays_grow_exponentially() {
        let counter = Arc::new(AtomicU32::new(0));
        let start = std::time::Instant::now();
        let config = RetryConfig::new()
            .with_max_retries(3)
            .with_initial_delay(50)
            .without_jitter();

        let _ = retry_with_backoff(counting_failures(counter.clone(), u32::MAX), config).await;

        // 50 + 100 + 200 ms of sleeping, minus scheduler slack
        assert!(start.elapsed().as_millis() >= 300);
    }

    #[test]
    fn jitter_stays_within_half_to_full_delay() {
        for _ in 0..10 {
            let jittered = apply_jitter(1000);
            assert!((500..=1000).contains(&jittered));
        }
    }
}
