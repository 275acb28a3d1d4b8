//! Shared plumbing for outbound HTTP APIs: error classification,
//! retry with backoff, and client-side rate limiting.

pub mod errors;
pub mod rate_limiter;
pub mod retry;

pub use errors::ApiError;
pub use rate_limiter::RateLimiter;
pub use retry::{with_timeout, RetryPolicy};

use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};

/// Build a reqwest client with the given request timeout.
pub fn build_client(timeout: Duration) -> DomainResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("guezi/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DomainError::Configuration(format!("failed to build HTTP client: {e}")))
}
