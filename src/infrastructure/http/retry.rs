use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::RetryConfig;

/// Retry policy with exponential backoff
///
/// Retries only errors for which `DomainError::is_transient` holds
/// (rate limits, 5xx, network failures, timeouts). Anything else is
/// returned on first occurrence.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    pub const fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }

    /// A policy that never retries.
    pub const fn none() -> Self {
        Self::new(0, 1, 1)
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn backoff(&self) -> impl Backoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_multiplier(2.0)
            .with_randomization_factor(0.1)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `operation` until it succeeds, fails permanently, or the retry
    /// budget is spent.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> DomainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        let max_retries = self.max_retries;
        let mut attempt = 0u32;

        let result = backoff::future::retry_notify(
            self.backoff(),
            || {
                attempt += 1;
                let current = attempt;
                let fut = operation();
                async move {
                    fut.await.map_err(|err| {
                        if err.is_transient() && current <= max_retries {
                            backoff::Error::transient(err)
                        } else {
                            backoff::Error::permanent(err)
                        }
                    })
                }
            },
            |err: DomainError, wait: Duration| {
                warn!(
                    operation = operation_name,
                    error = %err,
                    retry_in_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "transient failure, retrying"
                );
            },
        )
        .await;

        if result.is_ok() && attempt > 1 {
            debug!(operation = operation_name, attempts = attempt, "succeeded after retry");
        }
        result
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Apply a timeout to a fallible future; expiry is a transient failure.
pub async fn with_timeout<T, Fut>(timeout: Duration, what: &str, fut: Fut) -> DomainResult<T>
where
    Fut: Future<Output = DomainResult<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| DomainError::Transient(format!("{what} timed out after {timeout:?}")))?
}
