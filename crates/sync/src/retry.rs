//! Bounded retry with backoff around remote calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay before every retry
    Fixed,
    /// base * 2^(attempt - 1)
    #[default]
    Exponential,
    /// base * attempt
    Linear,
}

/// Retry policy for one kind of remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = no retries)
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
    /// Jitter factor (0.0-1.0)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(200), Duration::from_secs(2))
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
            jitter: 0.0,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
            jitter: 0.1,
        }
    }

    /// Delay before retry number `attempt` (1-indexed).
    ///
    /// Jitter is a fixed function of `attempt`, so a schedule replays
    /// identically under a paused clock.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let Some(step) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };
        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt).min(self.max_delay),
            BackoffStrategy::Exponential => {
                let factor = 1u32.checked_shl(step).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor).min(self.max_delay)
            }
        };

        let jitter = if self.jitter.is_finite() { self.jitter.clamp(0.0, 1.0) } else { 0.0 };
        let offset = jitter_offset(attempt);
        let spread = delay.mul_f64(jitter * offset.abs());
        if offset < 0.0 {
            delay.saturating_sub(spread)
        } else {
            delay.saturating_add(spread)
        }
    }

    /// `attempt` retries have already been made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or the
    /// policy is exhausted. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(op = label, retries = attempt, "remote call recovered");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && self.should_retry(attempt) => {
                    attempt += 1;
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        op = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "remote call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Pseudo-random value in [-1, 1) derived from the attempt number.
fn jitter_offset(attempt: u32) -> f64 {
    let bits = attempt.wrapping_mul(0x9E37_79B9) >> 16;
    f64::from(bits) / 32_768.0 - 1.0
}

/// Retry policy per remote operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub fetch: RetryPolicy,
    /// Creates are not idempotent; retrying one may duplicate the record.
    pub create: RetryPolicy,
    pub update: RetryPolicy,
    pub delete: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::with_max_retries(3)
    }
}

impl RetryConfig {
    /// Default backoff with `max_retries` for every idempotent operation.
    pub fn with_max_retries(max_retries: u32) -> Self {
        let policy =
            RetryPolicy::exponential(max_retries, Duration::from_millis(200), Duration::from_secs(2));
        Self {
            fetch: policy.clone(),
            create: RetryPolicy::no_retry(),
            update: policy.clone(),
            delete: policy,
        }
    }

    pub fn none() -> Self {
        Self {
            fetch: RetryPolicy::no_retry(),
            create: RetryPolicy::no_retry(),
            update: RetryPolicy::no_retry(),
            delete: RetryPolicy::no_retry(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn exponential_delay_is_capped() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::exponential(5, Duration::from_millis(200), Duration::from_secs(1))
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(1));
    }

    #[test]
    fn linear_and_fixed_delays() {
        let linear = RetryPolicy {
            strategy: BackoffStrategy::Linear,
            jitter: 0.0,
            ..RetryPolicy::exponential(3, Duration::from_millis(100), Duration::from_secs(1))
        };
        assert_eq!(linear.delay_for_attempt(3), Duration::from_millis(300));

        let fixed = RetryPolicy::fixed(2, Duration::from_millis(50));
        assert_eq!(fixed.delay_for_attempt(2), Duration::from_millis(50));
        assert!(fixed.should_retry(1));
        assert!(!fixed.should_retry(2));
    }

    #[test]
    fn jitter_stays_within_range() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(1000), Duration::from_secs(10));
        let d = policy.delay_for_attempt(1).as_millis();
        assert!((900..=1100).contains(&d));
    }

    #[test]
    fn jitter_replays_and_spreads_both_ways() {
        let policy = RetryPolicy::fixed(8, Duration::from_secs(1));
        let policy = RetryPolicy { jitter: 0.5, ..policy };

        let first: Vec<_> = (1..=8).map(|a| policy.delay_for_attempt(a)).collect();
        let again: Vec<_> = (1..=8).map(|a| policy.delay_for_attempt(a)).collect();
        assert_eq!(first, again);
        assert!(first.iter().any(|d| *d < Duration::from_secs(1)));
        assert!(first.iter().any(|d| *d > Duration::from_secs(1)));
        assert!(first.iter().all(|d| *d >= Duration::from_millis(500) && *d <= Duration::from_millis(1500)));
    }

    #[test]
    fn creates_never_retry_by_default() {
        let config = RetryConfig::default();
        assert_eq!(config.create.max_attempts, 0);
        assert_eq!(config.update.max_attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn run_retries_transient_failures() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(10));

        let out = policy
            .run("fetch", move || async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(SyncError::Transport("reset".into())),
                    _ => Ok(7),
                }
            })
            .await;

        assert_eq!(out, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn run_gives_up_after_budget() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::fixed(2, Duration::from_millis(10));

        let out: Result<(), _> = policy
            .run("update", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SyncError::server(500, "boom"))
            })
            .await;

        assert_eq!(out, Err(SyncError::server(500, "boom")));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn run_does_not_retry_client_errors() {
        let calls = &AtomicU32::new(0);
        let out: Result<(), _> = RetryPolicy::default()
            .run("update", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SyncError::Conflict("stale".into()))
            })
            .await;

        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
