// ABOUTME: Retry policy shared by push retries, lock polling, and verification.
// ABOUTME: Bounded by attempts and/or a deadline, with cancellable backoff sleeps.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Constant(Duration),
    /// `base * attempt` after the n-th failed attempt (1x, 2x, 3x, ...).
    Linear(Duration),
}

impl Backoff {
    /// Delay to wait after the given 1-based attempt failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Constant(d) => *d,
            Backoff::Linear(base) => base.saturating_mul(attempt),
        }
    }
}

/// How often and for how long an operation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub deadline: Option<Duration>,
    pub backoff: Backoff,
}

/// Why a retried operation gave up.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("timed out after {attempts} attempt(s): {last}")]
    TimedOut { attempts: u32, last: E },

    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. }
            | RetryError::TimedOut { attempts, .. }
            | RetryError::Cancelled { attempts } => *attempts,
        }
    }

    /// The last error returned by the operation, if it ran at all.
    pub fn into_last(self) -> Option<E> {
        match self {
            RetryError::Exhausted { last, .. } | RetryError::TimedOut { last, .. } => Some(last),
            RetryError::Cancelled { .. } => None,
        }
    }
}

impl RetryPolicy {
    /// `attempts` tries total, sleeping `base * attempt` in between.
    pub fn linear(attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts: Some(attempts.max(1)),
            deadline: None,
            backoff: Backoff::Linear(base),
        }
    }

    /// Poll every `interval` until `deadline` has elapsed.
    pub fn polling(interval: Duration, deadline: Duration) -> Self {
        Self {
            max_attempts: None,
            deadline: Some(deadline),
            backoff: Backoff::Constant(interval),
        }
    }

    /// Run `op` until it succeeds, the policy is exhausted, or `cancel` fires.
    ///
    /// `op` receives the 1-based attempt number. The operation always runs at
    /// least once, even with a zero deadline.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }

            attempt += 1;
            let last = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if self.max_attempts.is_some_and(|max| attempt >= max) {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last,
                });
            }

            let mut delay = self.backoff.delay(attempt);
            if let Some(deadline) = self.deadline {
                let elapsed = started.elapsed();
                if elapsed >= deadline {
                    return Err(RetryError::TimedOut {
                        attempts: attempt,
                        last,
                    });
                }
                delay = delay.min(deadline - elapsed);
            }

            tracing::debug!(attempt, ?delay, "retrying after failed attempt");

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
