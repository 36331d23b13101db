//! Retry logic.
//!
//! # Responsibilities
//! - Run one logical operation up to `max_retries + 1` times
//! - Wait a jittered exponential backoff between attempts (never after the last)
//! - Return the last error once attempts are exhausted
//!
//! # Design Decisions
//! - Attempts are strictly sequential; attempt N+1 starts after N settled
//! - Each attempt is independent; the operation must be safe to repeat
//! - Per-attempt deadlines belong to the operation (see timeouts.rs)
//! - Classification does not change eligibility: every failure is retried

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::BackoffPolicy;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, BackoffPolicy::from_config(config))
    }

    /// Same backoff, different retry bound.
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self
        }
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `op` until it succeeds or the retry bound is exhausted.
    ///
    /// `op` receives the 0-indexed attempt number.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_with_hook(op, |_, _, _| {}).await
    }

    /// Like [`run`](Self::run), calling `on_retry(attempt, delay, &error)`
    /// before each backoff sleep.
    pub async fn run_with_hook<T, E, F, Fut, H>(&self, mut op: F, mut on_retry: H) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        H: FnMut(u32, Duration, &E),
    {
        let mut attempt = 0u32;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_retries => {
                    let delay = self.backoff.delay(attempt);
                    tracing::info!(
                        attempt,
                        max_retries = self.max_retries,
                        delay = ?delay,
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    on_retry(attempt, delay, &err);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        attempts = attempt + 1,
                        error = %err,
                        "Retries exhausted"
                    );
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_retries,
            BackoffPolicy::new(Duration::from_millis(100), 2.0, Duration::from_secs(1)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_max_retries_failures() {
        let policy = fast_policy(2);
        let calls = AtomicU32::new(0);

        let result = policy
            .run(|_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(format!("failure {n}"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_with_exact_delays() {
        let policy = fast_policy(2);
        let mut delays = Vec::new();
        let start = Instant::now();

        let result: Result<(), String> = policy
            .run_with_hook(
                |attempt| async move { Err(format!("failure {attempt}")) },
                |attempt, delay, _| delays.push((attempt, delay)),
            )
            .await;

        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(delays.len(), 2);
        assert_eq!(delays[0].0, 0);
        assert_eq!(delays[1].0, 1);
        assert!(delays[0].1 >= Duration::from_millis(100));
        assert!(delays[1].1 >= Duration::from_millis(200));

        let waited: Duration = delays.iter().map(|(_, d)| *d).sum();
        assert!(start.elapsed() >= waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_runs_once() {
        let policy = fast_policy(0);
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("nope") }
            })
            .await;
        assert_eq!(result, Err("nope"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_sequential() {
        let policy = fast_policy(3);
        let counter = AtomicU32::new(0);
        let in_flight = &counter;

        let _: Result<(), String> = policy
            .run(move |_| {
                let concurrent = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    assert_eq!(concurrent, 1);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Err("again".to_string())
                }
            })
            .await;
    }
}
