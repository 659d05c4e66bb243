//! Bounded retry for transient storage failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::RepositoryError;

/// Exponential backoff with jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Upper bound of the sleep after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Sleep after failed attempt `attempt`: uniformly drawn from the upper
    /// half of [`ceiling`](Self::ceiling).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let ceiling = u64::try_from(self.ceiling(attempt).as_millis()).unwrap_or(u64::MAX);
        if ceiling == 0 {
            return Duration::ZERO;
        }
        let floor = ceiling / 2;
        Duration::from_millis(rand::rng().random_range(floor..=ceiling))
    }

    /// Run an idempotent read, retrying on pool timeouts and I/O failures.
    ///
    /// # Errors
    ///
    /// Returns the last error once attempts are exhausted, or the first
    /// non-transient error immediately.
    pub async fn read<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, RepositoryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        self.run(op, RepositoryError::is_transient, f).await
    }

    /// Run a write, retrying only when no connection could be acquired.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read), with the narrower retry predicate.
    pub async fn write<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, RepositoryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        self.run(op, RepositoryError::never_reached_server, f).await
    }

    async fn run<T, F, Fut>(
        &self,
        op: &'static str,
        retryable: fn(&RepositoryError) -> bool,
        mut f: F,
    ) -> Result<T, RepositoryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        let mut attempt = 1;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && retryable(&e) => {
                    let delay = self.delay(attempt);
                    tracing::warn!(
                        op,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Transient storage failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::super::TimeoutKind;
    use super::*;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_ceiling_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.ceiling(1), Duration::from_millis(100));
        assert_eq!(policy.ceiling(2), Duration::from_millis(200));
        assert_eq!(policy.ceiling(3), Duration::from_millis(350));
        assert_eq!(policy.ceiling(64), Duration::from_millis(350));
    }

    #[test]
    fn test_delay_stays_in_upper_half() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        };
        for _ in 0..50 {
            let delay = policy.delay(2);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(200));
        }
        assert_eq!(RetryPolicy::none().delay(1), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_read_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .read("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RepositoryError::Timeout(TimeoutKind::Acquire))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .read("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RepositoryError::Timeout(TimeoutKind::Acquire))
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_domain_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .read("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RepositoryError::NotFound)
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_does_not_retry_io_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .write("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
                Err(RepositoryError::from(sqlx::Error::Io(io)))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
