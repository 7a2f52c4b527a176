//! Retry logic with exponential backoff for throttled remote reads.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use std::time::Duration;

/// Retry behavior for transient remote errors.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (1 = no retry)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Upper bound on a single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Execute an operation, retrying retryable errors with exponential backoff.
///
/// Non-retryable errors are returned immediately. A cancellation during the
/// backoff sleep returns [`Error::Cancelled`].
pub fn with_retry<T, F>(
    config: &RetryConfig,
    cancel: &CancelToken,
    what: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || attempt + 1 >= max_attempts => return Err(e),
            Err(e) => {
                let delay = config.delay_for_attempt(attempt);
                log::warn!(
                    "{what}: attempt {}/{} failed: {e}. Retrying in {}s...",
                    attempt + 1,
                    max_attempts,
                    delay.as_secs()
                );
                if cancel.sleep(delay) {
                    return Err(Error::Cancelled);
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_success_first_try() {
        let result = with_retry(&RetryConfig::no_retry(), &CancelToken::new(), "op", || {
            Ok::<_, Error>(42)
        });
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_non_retryable_error_is_not_retried() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&fast(3), &CancelToken::new(), "op", || {
            attempts.set(attempts.get() + 1);
            Err(Error::NotFound("vpc".into()))
        });
        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_eventual_success() {
        let attempts = Cell::new(0);
        let result = with_retry(&fast(3), &CancelToken::new(), "op", || {
            let current = attempts.get();
            attempts.set(current + 1);
            if current < 2 {
                Err(Error::transient("Rate exceeded"))
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_all_attempts_fail() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&fast(3), &CancelToken::new(), "op", || {
            attempts.set(attempts.get() + 1);
            Err(Error::transient("Throttling"))
        });
        assert!(result.unwrap_err().is_retryable());
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_cancelled_during_backoff() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result: Result<()> =
            with_retry(&fast(3), &cancel, "op", || Err(Error::transient("Throttling")));
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_delay_for_attempt_is_capped() {
        let config = RetryConfig::new(5, Duration::from_secs(2), 2.0);
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(8));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(30));
    }
}
