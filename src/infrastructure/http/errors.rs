use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::infrastructure::logging::SecretScrubber;

/// Errors that can occur when calling an external HTTP API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request parameters (HTTP 400, 422)
    #[error("{api}: invalid request: {body}")]
    InvalidRequest { api: &'static str, body: String },

    /// Invalid or missing API key (HTTP 401)
    #[error("{api}: invalid API key, authentication failed")]
    InvalidApiKey { api: &'static str },

    /// Permission denied (HTTP 403)
    #[error("{api}: forbidden: {body}")]
    Forbidden { api: &'static str, body: String },

    /// Resource not found (HTTP 404)
    #[error("{api}: not found: {body}")]
    NotFound { api: &'static str, body: String },

    /// Rate limit exceeded (HTTP 429)
    #[error("{api}: rate limit exceeded")]
    RateLimitExceeded { api: &'static str },

    /// Server error (HTTP 5xx)
    #[error("{api}: server error ({status}): {body}")]
    ServerError {
        api: &'static str,
        status: StatusCode,
        body: String,
    },

    /// Network, connection, or timeout error
    #[error("{api}: network error: {message}")]
    Network { api: &'static str, message: String },

    /// Response did not match the expected shape
    #[error("{api}: malformed response: {message}")]
    MalformedResponse { api: &'static str, message: String },

    /// Unknown or unexpected status
    #[error("{api}: unexpected status ({status}): {body}")]
    Unexpected {
        api: &'static str,
        status: StatusCode,
        body: String,
    },
}

impl ApiError {
    /// Classify a non-success response. The body is scrubbed of credentials
    /// and truncated before it is kept.
    pub fn from_status(api: &'static str, status: StatusCode, body: &str) -> Self {
        let body = SecretScrubber::global().scrub(body);
        let body: String = body.chars().take(500).collect();
        match status.as_u16() {
            400 | 422 => Self::InvalidRequest { api, body },
            401 => Self::InvalidApiKey { api },
            403 => Self::Forbidden { api, body },
            404 => Self::NotFound { api, body },
            429 => Self::RateLimitExceeded { api },
            500..=599 => Self::ServerError { api, status, body },
            _ => Self::Unexpected { api, status, body },
        }
    }

    pub fn network(api: &'static str, err: &reqwest::Error) -> Self {
        let message = SecretScrubber::global().scrub(&err.to_string());
        Self::Network { api, message }
    }

    pub fn malformed(api: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            api,
            message: message.into(),
        }
    }

    /// Returns true if this error is transient and should be retried
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::ServerError { .. } | Self::Network { .. }
        )
    }
}

impl From<ApiError> for DomainError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound { .. } => Self::NotFound(err.to_string()),
            ApiError::MalformedResponse { .. } => Self::DataIntegrity(err.to_string()),
            ref e if e.is_transient() => Self::Transient(err.to_string()),
            _ => Self::Upstream(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        for status in [429, 500, 502, 503, 504] {
            let err = ApiError::from_status("test", StatusCode::from_u16(status).unwrap(), "");
            assert!(err.is_transient(), "{status} should be transient");
            assert!(DomainError::from(err).is_transient());
        }
    }

    #[test]
    fn test_permanent_statuses() {
        for status in [400, 401, 403] {
            let err = ApiError::from_status("test", StatusCode::from_u16(status).unwrap(), "");
            assert!(!err.is_transient(), "{status} should be permanent");
            assert!(matches!(DomainError::from(err), DomainError::Upstream(_)));
        }
    }

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err = ApiError::from_status("sefaria", StatusCode::NOT_FOUND, "no such ref");
        assert!(matches!(DomainError::from(err), DomainError::NotFound(_)));
    }

    #[test]
    fn test_body_is_scrubbed() {
        let err = ApiError::from_status(
            "openai",
            StatusCode::BAD_REQUEST,
            "Incorrect API key provided: sk-proj-abcdefghijklmnopqrstuvwxyz",
        );
        let message = err.to_string();
        assert!(!message.contains("abcdefghijklmnopqrstuvwxyz"));
        assert!(message.contains("[API_KEY_REDACTED]"));
    }
}
