//! Bounded exponential backoff for remote calls.

use std::future::Future;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::remote::RemoteError;

/// `max_retries` is the total number of attempts.  After failed attempt `i`
/// (0-indexed) the caller sleeps `2^i × base_delay`, but only if the error
/// is transient and another attempt remains.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            base_delay: Duration::from_millis(config.base_backoff_ms),
        }
    }

    /// Backoff slept after failed attempt `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }

    /// Run `op` until it succeeds, fails permanently or runs out of attempts.
    /// Returns the last error on failure.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let attempts = self.max_retries.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => {
                    log::warn!("remote call failed permanently: {e}");
                    return Err(e);
                }
                Err(e) if attempt + 1 >= attempts => {
                    log::warn!("remote call failed after {attempts} attempts: {e}");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    log::warn!(
                        "remote call attempt {} failed ({e}); retrying in {}ms",
                        attempt + 1,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::from_secs(1));
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_transient_failures_only() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let start = tokio::time::Instant::now();

        let result: Result<(), _> = RetryPolicy::default()
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::Timeout)
            })
            .await;

        assert!(matches!(result, Err(RemoteError::Timeout)));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // 1s + 2s, nothing after the last attempt.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_millis(3_100));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let start = tokio::time::Instant::now();

        let result: Result<(), _> = RetryPolicy::default()
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::Schema("no verses".into()))
            })
            .await;

        assert!(matches!(result, Err(RemoteError::Schema(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[test]
    fn config_zero_retries_still_attempts_once() {
        let policy = RetryPolicy::from_config(&FetchConfig {
            max_retries: 0,
            ..FetchConfig::default()
        });
        assert_eq!(policy.max_retries, 1);
    }
}
