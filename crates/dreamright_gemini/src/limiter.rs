//! Rate limiter built on governor (GCRA) and a Tokio semaphore.
//!
//! RPM, TPM, and RPD quotas go through governor; concurrent request
//! limits go through a semaphore whose permits are released by an RAII
//! guard. [`RateLimiter::execute`] layers exponential-backoff retry on
//! top for transient API failures.

use crate::Tier;
use dreamright_error::RetryableError;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter enforcing the quota types a [`Tier`] declares.
///
/// Generation runs are long batches of image requests, so the limiter is
/// designed to be waited on: [`RateLimiter::acquire`] blocks until every
/// quota allows the request rather than failing fast.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = RateLimiter::new(tier_config);
///
/// let guard = limiter.acquire(1000).await;
/// // make the API call...
/// drop(guard); // releases the concurrent slot
/// ```
#[derive(Clone)]
pub struct RateLimiter<T: Tier> {
    inner: T,
    rpm_limiter: Option<Arc<DirectRateLimiter>>,
    tpm_limiter: Option<Arc<DirectRateLimiter>>,
    rpd_limiter: Option<Arc<DirectRateLimiter>>,
    concurrent_semaphore: Arc<Semaphore>,
}

impl<T: Tier> RateLimiter<T> {
    /// Create a rate limiter from a tier, enforcing every limit the tier
    /// reports as `Some`.
    pub fn new(tier: T) -> Self {
        let rpm_limiter = tier.rpm().and_then(|rpm| {
            NonZeroU32::new(rpm).map(|n| {
                let quota = Quota::per_minute(n);
                Arc::new(GovernorRateLimiter::direct(quota))
            })
        });

        // Governor quotas are u32; TPM values above that are effectively unlimited
        let tpm_limiter = tier.tpm().and_then(|tpm| {
            NonZeroU32::new(tpm.min(u32::MAX as u64) as u32).map(|n| {
                let quota = Quota::per_minute(n);
                Arc::new(GovernorRateLimiter::direct(quota))
            })
        });

        // Modeled as a per-minute quota with full daily burst allowed up front
        let rpd_limiter = tier.rpd().and_then(|rpd| {
            NonZeroU32::new(rpd).map(|n| {
                let quota = Quota::per_minute(n).allow_burst(n);
                Arc::new(GovernorRateLimiter::direct(quota))
            })
        });

        let max_concurrent = tier.max_concurrent().unwrap_or(u32::MAX);
        let concurrent_semaphore = Arc::new(Semaphore::new(max_concurrent as usize));

        Self {
            inner: tier,
            rpm_limiter,
            tpm_limiter,
            rpd_limiter,
            concurrent_semaphore,
        }
    }

    /// Get a reference to the inner tier.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Wait until all quotas allow a request, then take a concurrent slot.
    ///
    /// `estimated_tokens` feeds the TPM quota; use a conservative estimate
    /// when the real token count is unknown.
    pub async fn acquire(&self, estimated_tokens: u64) -> RateLimiterGuard {
        if let Some(limiter) = &self.rpm_limiter {
            limiter.until_ready().await;
        }

        if let Some(limiter) = &self.tpm_limiter {
            // Governor has no "consume N" API, so acquire token by token
            let tokens = (estimated_tokens.min(u32::MAX as u64) as u32).max(1);
            for _ in 0..tokens {
                limiter.until_ready().await;
            }
        }

        if let Some(limiter) = &self.rpd_limiter {
            limiter.until_ready().await;
        }

        // Taken last so a slot is never held while waiting on quotas
        let permit = self
            .concurrent_semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("Semaphore should not be closed");

        RateLimiterGuard { _permit: permit }
    }

    /// Try to acquire without waiting. Returns `None` if any limit would block.
    pub fn try_acquire(&self, estimated_tokens: u64) -> Option<RateLimiterGuard> {
        if let Some(limiter) = &self.rpm_limiter {
            limiter.check().ok()?;
        }

        if let Some(limiter) = &self.tpm_limiter {
            let tokens = (estimated_tokens.min(u32::MAX as u64) as u32).max(1);
            for _ in 0..tokens {
                limiter.check().ok()?;
            }
        }

        if let Some(limiter) = &self.rpd_limiter {
            limiter.check().ok()?;
        }

        let permit = self.concurrent_semaphore.clone().try_acquire_owned().ok()?;

        Some(RateLimiterGuard { _permit: permit })
    }

    /// Execute an operation with rate limiting and automatic retry.
    ///
    /// Each attempt re-acquires rate limit permission, so retries after a
    /// 429 wait for quota instead of hammering the API. Transient errors
    /// retry with exponential backoff using the error's own
    /// [`RetryableError::retry_strategy_params`], so a 429 backs off
    /// longer between fewer attempts than a 503; permanent errors
    /// (400, 401) fail immediately.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let response = limiter.execute(1000, || async {
    ///     client.post_generate(&body).await
    /// }).await?;
    /// ```
    pub async fn execute<F, Fut, R, E>(&self, estimated_tokens: u64, operation: F) -> Result<R, E>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<R, E>>,
        E: RetryableError + std::fmt::Display,
    {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio_retry2::{Retry, RetryError, strategy::ExponentialBackoff, strategy::jitter};
        use tracing::warn;

        // The outer strategy is only a ceiling on attempts; the actual
        // delay and retry budget come from each error's parameters via
        // `retry_after` below.
        let retry_strategy = ExponentialBackoff::from_millis(2000)
            .factor(2)
            .max_delay(std::time::Duration::from_secs(60))
            .map(jitter)
            .take(5);

        let failures = AtomicUsize::new(0);

        Retry::spawn(retry_strategy, || async {
            let _guard = self.acquire(estimated_tokens).await;

            match operation().await {
                Ok(value) => Ok(value),
                Err(e) => {
                    if !e.is_retryable() {
                        warn!("Permanent error, failing immediately: {}", e);
                        return Err(RetryError::Permanent(e));
                    }

                    let failure = failures.fetch_add(1, Ordering::Relaxed);
                    let (initial_ms, max_retries, max_delay_secs) = e.retry_strategy_params();
                    if failure + 1 >= max_retries {
                        warn!("Retries exhausted after {} attempts: {}", failure + 1, e);
                        return Err(RetryError::Permanent(e));
                    }

                    let delay_ms = initial_ms
                        .saturating_mul(1 << failure.min(16))
                        .min(max_delay_secs.saturating_mul(1000));
                    warn!(delay_ms, "Transient error, will retry: {}", e);
                    Err(RetryError::Transient {
                        err: e,
                        retry_after: Some(std::time::Duration::from_millis(delay_ms)),
                    })
                }
            }
        })
        .await
    }
}

/// RAII guard that returns the concurrent request slot on drop, even if
/// the request failed or panicked.
pub struct RateLimiterGuard {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestTier {
        max_concurrent: Option<u32>,
    }

    impl Tier for TestTier {
        fn rpm(&self) -> Option<u32> {
            None
        }
        fn tpm(&self) -> Option<u64> {
            None
        }
        fn rpd(&self) -> Option<u32> {
            None
        }
        fn max_concurrent(&self) -> Option<u32> {
            self.max_concurrent
        }
        fn name(&self) -> &str {
            "Test"
        }
    }

    #[tokio::test]
    async fn concurrent_limit_blocks_second_acquire() {
        let limiter = RateLimiter::new(TestTier {
            max_concurrent: Some(1),
        });

        let guard = limiter.acquire(1).await;
        assert!(limiter.try_acquire(1).is_none());

        drop(guard);
        assert!(limiter.try_acquire(1).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn execute_respects_per_error_retry_budget() {
        use dreamright_error::{GeminiError, GeminiErrorKind};
        use std::sync::atomic::{AtomicUsize, Ordering};

        let limiter = RateLimiter::new(TestTier {
            max_concurrent: None,
        });

        // 429 carries a budget of 3 attempts
        let calls = AtomicUsize::new(0);
        let result: Result<(), GeminiError> = limiter
            .execute(1, || async {
                calls.fetch_add(1, Ordering::Relaxed);
                Err(GeminiError::new(GeminiErrorKind::HttpError {
                    status_code: 429,
                    message: "rate limited".to_string(),
                }))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 3);

        // 503 allows 5
        let calls = AtomicUsize::new(0);
        let result: Result<(), GeminiError> = limiter
            .execute(1, || async {
                calls.fetch_add(1, Ordering::Relaxed);
                Err(GeminiError::new(GeminiErrorKind::HttpError {
                    status_code: 503,
                    message: "unavailable".to_string(),
                }))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn execute_fails_permanent_errors_without_retry() {
        use dreamright_error::{GeminiError, GeminiErrorKind};
        use std::sync::atomic::{AtomicUsize, Ordering};

        let limiter = RateLimiter::new(TestTier {
            max_concurrent: None,
        });

        let calls = AtomicUsize::new(0);
        let result: Result<(), GeminiError> = limiter
            .execute(1, || async {
                calls.fetch_add(1, Ordering::Relaxed);
                Err(GeminiError::new(GeminiErrorKind::HttpError {
                    status_code: 401,
                    message: "unauthorized".to_string(),
                }))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn unlimited_tier_never_blocks() {
        let limiter = RateLimiter::new(TestTier {
            max_concurrent: None,
        });

        let _a = limiter.acquire(100).await;
        let _b = limiter.acquire(100).await;
        assert!(limiter.try_acquire(100).is_some());
    }
}
