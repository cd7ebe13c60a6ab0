//! Bounded retry with exponential backoff for upstream submissions.
//!
//! Submission is the only place the pipeline retries on its own. Polls are
//! never retried here: a failed poll leaves the slot pending and the next
//! reconciliation asks again.

use std::future::Future;
use std::time::Duration;

/// Tunable parameters for submission retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. At least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on the delay between attempts.
    pub max_backoff: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay, clamped to [`RetryPolicy::max_backoff`].
pub fn next_delay(current: Duration, policy: &RetryPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_backoff)
}

/// Result of a retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Success { value: T, attempts: u32 },
    /// Every attempt failed; `error` is the last one.
    Exhausted { error: E, attempts: u32 },
}

/// Run `operation` until it succeeds or the policy's attempts are used up,
/// sleeping with exponential backoff in between.
///
/// `label` identifies the operation in logs.
pub async fn retry_async<F, Fut, T, E>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_backoff;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => {
                return RetryOutcome::Success {
                    value,
                    attempts: attempt,
                }
            }
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    operation = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying",
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, policy);
            }
            Err(e) => {
                return RetryOutcome::Exhausted {
                    error: e,
                    attempts: attempt,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;

    use super::*;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            multiplier: 2.0,
        }
    }

    #[test]
    fn next_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(
            next_delay(Duration::from_millis(500), &policy),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let policy = RetryPolicy::default();
        assert_eq!(next_delay(Duration::from_secs(4), &policy), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let outcome = retry_async(&fast(3), "test", |_| async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("busy")
            } else {
                Ok("h1")
            }
        })
        .await;
        assert_matches!(outcome, RetryOutcome::Success { value: "h1", attempts: 3 });
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<(), _> = retry_async(&fast(3), "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("rejected #{attempt}")) }
        })
        .await;
        assert_matches!(outcome, RetryOutcome::Exhausted { error, attempts: 3 } if error == "rejected #3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let outcome: RetryOutcome<(), &str> = retry_async(&fast(0), "test", |_| async { Err("no") }).await;
        assert_matches!(outcome, RetryOutcome::Exhausted { attempts: 1, .. });
    }
}
