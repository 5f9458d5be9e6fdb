//! Bounded retry with exponential backoff for remote requests.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use quant_core::error::DataError;
use tracing::warn;

/// How often and how patiently a failed request is repeated.
///
/// `max_attempts` counts the first try, so `max_attempts = 1` never retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay
    pub max_backoff_ms: u64,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".into());
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(format!(
                "retry.multiplier must be >= 1.0, got {}",
                self.multiplier
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err("retry.max_backoff_ms must be >= retry.initial_backoff_ms".into());
        }
        Ok(())
    }

    /// Delay before retry number `retry` (0 = first retry).
    pub fn backoff(&self, retry: u32) -> Duration {
        let scaled = self.initial_backoff_ms as f64 * self.multiplier.powi(retry as i32);
        let capped = scaled.min(self.max_backoff_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Delay before retrying after `error`, honoring a server retry-after hint.
    ///
    /// `None` when the hint exceeds `max_backoff_ms`; such a request is not
    /// retried.
    pub fn delay_for(&self, retry: u32, error: &DataError) -> Option<Duration> {
        let backoff = self.backoff(retry);
        match error {
            DataError::RateLimited { retry_after_secs } => {
                let hint = Duration::from_secs(*retry_after_secs);
                (hint <= Duration::from_millis(self.max_backoff_ms)).then(|| backoff.max(hint))
            }
            _ => Some(backoff),
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only transient errors (see [`DataError::is_transient`]) are retried.
    /// The last error is returned when the budget is exhausted.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, DataError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DataError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let Some(delay) = self.delay_for(attempt - 1, &e) else {
                        warn!(
                            request = label,
                            attempt,
                            error = %e,
                            "Retry-after hint exceeds max backoff, giving up"
                        );
                        return Err(e);
                    };
                    warn!(
                        request = label,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Request failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff(10), Duration::from_millis(8000));
    }

    #[test]
    fn test_rate_limit_hint_extends_delay() {
        let policy = RetryPolicy::default();
        let err = DataError::RateLimited { retry_after_secs: 5 };
        assert_eq!(policy.delay_for(0, &err), Some(Duration::from_secs(5)));

        let err = DataError::Remote("502".into());
        assert_eq!(policy.delay_for(1, &err), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_rate_limit_hint_beyond_cap_is_not_waited() {
        let policy = RetryPolicy::default();
        let err = DataError::RateLimited { retry_after_secs: 600 };
        assert_eq!(policy.delay_for(0, &err), None);
    }

    #[tokio::test]
    async fn test_long_rate_limit_surfaces_immediately() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 5,
            ..RetryPolicy::default()
        };
        let result: Result<(), _> = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DataError::RateLimited { retry_after_secs: 120 })
            })
            .await;

        assert!(matches!(result, Err(DataError::RateLimited { retry_after_secs: 120 })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validate() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(fast_policy(0).validate().is_err());
        let mut policy = RetryPolicy::default();
        policy.multiplier = 0.5;
        assert!(policy.validate().is_err());
    }

    #[tokio::test]
    async fn test_stops_at_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DataError::Remote("connection reset".into()))
            })
            .await;

        assert!(matches!(result, Err(DataError::Remote(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(DataError::Timeout(Duration::from_secs(1)))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(5)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DataError::SymbolNotFound("NOPE/BTC".into()))
            })
            .await;

        assert!(matches!(result, Err(DataError::SymbolNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
