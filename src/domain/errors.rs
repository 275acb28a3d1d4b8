//! Domain errors for the guezi retrieval core.

use thiserror::Error;

/// Domain-level errors that can occur while fetching, indexing, or retrieving.
///
/// The variants follow the failure taxonomy the services act on:
/// transient failures are retried, configuration and data-integrity
/// failures stop the process, retrieval failures degrade the answer.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data integrity error: {0}. The index must be rebuilt")]
    DataIntegrity(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Upstream rejected the request: {0}")]
    Upstream(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl DomainError {
    /// Whether a retry with backoff may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Transient(format!("database unreachable: {err}"))
            }
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
