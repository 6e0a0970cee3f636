use std::time::Duration;

use tracing::debug;

/// Bounded, fixed-interval retry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with an error that must not be retried.
    Aborted(E),
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
            RetryError::Aborted(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RetryError<E> {}

/// Runs `op` until it succeeds, `should_retry` rejects its error, or the
/// policy's attempts run out. Sleeps `policy.delay` between attempts.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E>(
    policy: RetryPolicy,
    mut op: impl FnMut(u32) -> Result<T, E>,
    mut should_retry: impl FnMut(&E) -> bool,
) -> Result<T, RetryError<E>> {
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(v) => return Ok(v),
            Err(e) if !should_retry(&e) => return Err(RetryError::Aborted(e)),
            Err(e) if attempt >= max => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                })
            }
            Err(_) => {
                debug!(attempt, max, "retrying after {:?}", policy.delay);
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{retry, RetryError, RetryPolicy};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn succeeds_once_ready() {
        let policy = RetryPolicy::new(5, Duration::from_millis(300));
        let started = tokio::time::Instant::now();
        let out = retry(policy, |n| if n < 3 { Err("not ready") } else { Ok(n) }, |_| true).await;
        assert_eq!(out, Ok(3));
        assert_eq!(started.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let out: Result<(), _> = retry(
            RetryPolicy::default(),
            |_| {
                calls += 1;
                Err("not ready")
            },
            |_| true,
        )
        .await;
        assert_eq!(
            out,
            Err(RetryError::Exhausted {
                attempts: 5,
                last: "not ready"
            })
        );
        assert_eq!(calls, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_abort_immediately() {
        let out: Result<(), _> = retry(RetryPolicy::default(), |_| Err("bad input"), |e| *e != "bad input").await;
        assert_eq!(out, Err(RetryError::Aborted("bad input")));
    }
}
