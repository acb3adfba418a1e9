//! Bounded exponential backoff for calls to external services.
//!
//! ## Retry Strategy
//!
//! Rate limits and flaky TTS endpoints are transient. The wait before retry
//! `n` is `backoff_ms * 2^(n-1)`: with a 500 ms base and 2 retries the
//! sequence is 500 ms then 1 s. Failures the caller marks as permanent are
//! returned immediately.

use crate::config::PipelineConfig;
use std::fmt;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::warn;

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. 0 means a single attempt.
    pub max_retries: u32,
    pub backoff_ms: u64,
}

/// The last error once retries are exhausted (or the error was permanent).
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted<E> {
    pub error: E,
    /// Attempts actually made, including the first.
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_ms,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.max_retries, config.retry_backoff_ms)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        mut op: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, Exhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                let backoff = self.delay(attempt);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    label,
                    attempt,
                    self.max_retries,
                    backoff.as_millis()
                );
                sleep(backoff).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    warn!("{}: attempt {} failed: {}", label, attempt + 1, error);
                    if attempt >= self.max_retries || !is_retryable(&error) {
                        return Err(Exhausted {
                            error,
                            attempts: attempt + 1,
                        });
                    }
                }
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_doubles() {
        let p = RetryPolicy::new(3, 500);
        assert_eq!(p.delay(1), Duration::from_millis(500));
        assert_eq!(p.delay(2), Duration::from_millis(1000));
        assert_eq!(p.delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = tokio_test::block_on(RetryPolicy::new(2, 1).run(
            "test",
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("busy".to_string())
                } else {
                    Ok(42)
                }
            },
            |_| true,
        ));
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn zero_retries_is_single_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = tokio_test::block_on(RetryPolicy::new(0, 1).run(
            "test",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            },
            |_| true,
        ));
        assert_eq!(
            result,
            Err(Exhausted {
                error: "down".to_string(),
                attempts: 1
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = tokio_test::block_on(RetryPolicy::new(5, 1).run(
            "test",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("bad input".to_string())
            },
            |e: &String| !e.starts_with("bad"),
        ));
        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
