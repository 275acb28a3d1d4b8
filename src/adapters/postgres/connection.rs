//! Postgres connection pool management.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::domain::models::PostgresConfig;
use crate::infrastructure::logging::SecretScrubber;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to create pool: {0}")]
    PoolCreationFailed(#[source] sqlx::Error),
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),
}

impl From<ConnectionError> for DomainError {
    fn from(err: ConnectionError) -> Self {
        let message = SecretScrubber::global().scrub(&err.to_string());
        match err {
            ConnectionError::InvalidDatabaseUrl(_) => Self::Configuration(message),
            ConnectionError::PoolCreationFailed(_) | ConnectionError::ConnectionFailed(_) => {
                Self::RetrievalUnavailable(message)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&PostgresConfig> for PoolConfig {
    fn from(config: &PostgresConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            acquire_timeout: Duration::from_secs(config.connect_timeout_secs),
            ..Self::default()
        }
    }
}

pub async fn create_pool(database_url: &str, config: Option<PoolConfig>) -> Result<PgPool, ConnectionError> {
    let config = config.unwrap_or_default();

    // Never echo the URL: it usually carries the password
    let connect_options = PgConnectOptions::from_str(database_url).map_err(|_| {
        ConnectionError::InvalidDatabaseUrl("could not parse postgres connection URL".to_string())
    })?;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(ConnectionError::PoolCreationFailed)
}

pub async fn verify_connection(pool: &PgPool) -> Result<(), ConnectionError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(ConnectionError::ConnectionFailed)?;
    Ok(())
}
