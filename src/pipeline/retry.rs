//! Exponential-backoff retry around a fallible async operation.
//!
//! Used for both network paths: URL downloads and AI calls. The wait after
//! failed attempt `n` is [`RetryPolicy::delay_after`]`(n)`, so the default
//! policy sleeps 10 s → 20 s between its three attempts. No wait follows the
//! final attempt.

use crate::config::RetryPolicy;
use std::fmt::Display;
use std::future::Future;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Every attempt failed.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Attempts made: `policy.max_attempts`, or fewer when an error was not retryable.
    pub attempts: u32,
    /// Error from the final attempt.
    pub last: E,
}

/// Run `op` until it succeeds or `policy.max_attempts` is exhausted.
///
/// `op` receives the 1-based attempt number. `label` only appears in logs.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    op: F,
) -> Result<T, RetryError<E>>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_with_backoff_if(policy, label, |_| true, op).await
}

/// Like [`retry_with_backoff`], but an error for which `retryable` returns
/// `false` ends the loop at once.
pub async fn retry_with_backoff_if<T, E, P, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    retryable: P,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: Display,
    P: Fn(&E) -> bool,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => {
                if attempt > 1 {
                    debug!("{}: succeeded on attempt {}/{}", label, attempt, max);
                }
                return Ok(v);
            }
            Err(e) if !retryable(&e) => {
                warn!("{}: attempt {}/{} failed: {}. Not retryable.", label, attempt, max, e);
                return Err(RetryError {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) if attempt >= max => {
                warn!("{}: attempt {}/{} failed: {}. Giving up.", label, attempt, max, e);
                return Err(RetryError {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                let wait = policy.delay_after(attempt);
                warn!(
                    "{}: attempt {}/{} failed: {}. Retrying in {:?}",
                    label, attempt, max, e, wait
                );
                sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let out = retry_with_backoff(&fast(3), "test", |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err("busy")
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(out.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn reports_last_error_after_exhaustion() {
        let calls = AtomicU32::new(0);
        let err = retry_with_backoff(&fast(2), "test", |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(format!("fail {n}")) }
        })
        .await
        .unwrap_err();
        assert_eq!(err.attempts, 2);
        assert_eq!(err.last, "fail 2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let err = retry_with_backoff_if(
            &fast(5),
            "test",
            |e: &&str| *e != "gone",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("gone") }
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(err.last, "gone");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_attempt_never_sleeps() {
        let err = tokio_test::block_on(retry_with_backoff(
            &RetryPolicy::none(),
            "test",
            |_| async { Err::<(), _>("nope") },
        ))
        .unwrap_err();
        assert_eq!(err.attempts, 1);
    }
}
