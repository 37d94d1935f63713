// ── Bounded retry ──
//
// The one retry loop used by login, fetches and restart. Attempts are
// capped, backoff grows linearly with the attempt number, and only errors
// the caller's predicate accepts are retried.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Hard ceiling on attempts, whatever the configuration says.
pub const MAX_ATTEMPTS: u32 = 3;

/// Attempt budget and backoff step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay after the first failure; the n-th failure waits n steps.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff_step: Duration::from_secs(1),
        }
    }
}

/// The last error of a run that gave up, with how many attempts it took.
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub attempts: u32,
    pub error: E,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts,
            backoff_step,
        }
    }

    /// A policy that tries exactly once.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Effective attempt budget, between 1 and [`MAX_ATTEMPTS`].
    pub fn attempts(&self) -> u32 {
        self.max_attempts.clamp(1, MAX_ATTEMPTS)
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }

    /// Run `attempt` until it succeeds, fails with an error `retryable`
    /// rejects, or the budget is spent. The closure receives the 1-based
    /// attempt number.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        operation: &str,
        retryable: P,
        mut attempt: F,
    ) -> Result<T, RetryFailure<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let budget = self.attempts();
        let mut number = 1;

        loop {
            match attempt(number).await {
                Ok(value) => {
                    if number > 1 {
                        debug!(operation, attempt = number, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    warn!(operation, attempt = number, of = budget, %error, "attempt failed");
                    if number >= budget || !retryable(&error) {
                        return Err(RetryFailure {
                            attempts: number,
                            error,
                        });
                    }
                    tokio::time::sleep(self.delay_after(number)).await;
                    number += 1;
                }
            }
        }
    }
}
