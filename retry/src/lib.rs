//! Shared bounded-retry helper.
//!
//! A single reusable `retry` function replaces the ad-hoc retry loops the
//! reference implementation scattered across the embedding and graph-store
//! call sites: give it the operation, a predicate for which errors are worth
//! retrying, a max attempt count, a base delay and whether to jitter it.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        if !self.jitter {
            return backoff;
        }
        let jitter_frac: f64 = rand::random::<f64>() * 0.25;
        backoff.mul_f64(1.0 + jitter_frac)
    }
}

/// Runs `op` up to `policy.max_attempts` times, retrying only when
/// `is_retryable` returns true for the returned error. Returns the last
/// error once attempts are exhausted.
pub async fn retry<T, E, Op, Fut, Retryable>(
    policy: RetryPolicy,
    mut op: Op,
    is_retryable: Retryable,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Retryable: Fn(&E) -> bool,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !is_retryable(&err) {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                warn!(attempt, ?delay, "retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            jitter: false,
        };
        let result: Result<u32, &str> = retry(
            policy,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("rate_limited")
                    } else {
                        Ok(42)
                    }
                }
            },
            |_| true,
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_non_retryable_error() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            jitter: false,
        };
        let result: Result<u32, &str> =
            retry(policy, || async { Err("permission_denied") }, |e| *e != "permission_denied").await;
        assert_eq!(result, Err("permission_denied"));
    }

    #[tokio::test]
    async fn exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            jitter: false,
        };
        let result: Result<u32, &str> = retry(
            policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("rate_limited") }
            },
            |_| true,
        )
        .await;
        assert_eq!(result, Err("rate_limited"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
