use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::RateLimitConfig;

/// Token bucket rate limiter for outbound API requests
///
/// Shared by every request a client makes; callers `acquire` before each
/// request and wait when the bucket is empty.
pub struct RateLimiter {
    inner: DefaultDirectRateLimiter,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> DomainResult<Self> {
        if !(config.requests_per_second > 0.0 && config.requests_per_second.is_finite()) {
            return Err(DomainError::Configuration(format!(
                "requests_per_second must be positive, got {}",
                config.requests_per_second
            )));
        }

        let burst = NonZeroU32::new(config.burst_size).ok_or_else(|| {
            DomainError::Configuration("burst_size must be at least 1".to_string())
        })?;
        let period = Duration::from_secs_f64(1.0 / config.requests_per_second);
        let quota = Quota::with_period(period)
            .ok_or_else(|| {
                DomainError::Configuration(format!(
                    "requests_per_second {} is too high",
                    config.requests_per_second
                ))
            })?
            .allow_burst(burst);

        Ok(Self {
            inner: governor::RateLimiter::direct(quota),
        })
    }

    /// Wait until a request may be sent.
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_burst_is_immediate() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            requests_per_second: 1.0,
            burst_size: 3,
        })
        .unwrap();

        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_waits_once_bucket_is_empty() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            requests_per_second: 20.0,
            burst_size: 1,
        })
        .unwrap();

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(RateLimiter::new(&RateLimitConfig {
            requests_per_second: 0.0,
            burst_size: 1,
        })
        .is_err());
        assert!(RateLimiter::new(&RateLimitConfig {
            requests_per_second: 1.0,
            burst_size: 0,
        })
        .is_err());
    }
}
