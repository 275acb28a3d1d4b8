//! Versioned schema migrations for the pgvector backend.
//!
//! Migration SQL is embedded at compile time. The vector column width is
//! a deployment setting, so `{{dimension}}` placeholders are substituted
//! before a migration runs.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::errors::DomainError;

/// pgvector refuses IVFFlat indexes above this many dimensions
pub const IVFFLAT_MAX_DIMENSION: usize = 2000;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to execute migration {version}: {source}")]
    ExecutionError {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to get schema version: {0}")]
    VersionCheckError(#[source] sqlx::Error),
    #[error("Stored vectors have dimension {stored}, configured dimension is {configured}")]
    DimensionMismatch { stored: usize, configured: usize },
}

impl From<MigrationError> for DomainError {
    fn from(err: MigrationError) -> Self {
        match err {
            MigrationError::DimensionMismatch { .. } => Self::DataIntegrity(err.to_string()),
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    sql: &'static str,
}

impl Migration {
    /// The migration SQL for a store of the given dimension
    pub fn render(&self, dimension: usize) -> String {
        self.sql.replace("{{dimension}}", &dimension.to_string())
    }
}

pub fn all_embedded_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Corpus chunks table",
            sql: include_str!("../../../migrations/001_corpus_chunks.sql"),
        },
        Migration {
            version: 2,
            description: "Search functions",
            sql: include_str!("../../../migrations/002_search_functions.sql"),
        },
        Migration {
            version: 3,
            description: "Index-backed nearest-neighbour ordering",
            sql: include_str!("../../../migrations/003_index_friendly_search.sql"),
        },
    ]
}

pub struct Migrator {
    pool: PgPool,
    dimension: usize,
}

impl Migrator {
    pub fn new(pool: PgPool, dimension: usize) -> Self {
        Self { pool, dimension }
    }

    /// Apply pending migrations and make sure the ANN index exists.
    /// Returns the number of migrations applied.
    pub async fn run(&self, ivfflat_lists: u32) -> Result<usize, MigrationError> {
        self.ensure_migrations_table().await?;
        let current_version = self.get_current_version().await?;
        let pending: Vec<_> = all_embedded_migrations()
            .into_iter()
            .filter(|m| m.version > current_version)
            .collect();

        for migration in &pending {
            self.apply_migration(migration).await?;
            info!(version = migration.version, description = migration.description, "applied migration");
        }

        self.check_dimension().await?;
        self.ensure_ann_index(ivfflat_lists).await?;
        Ok(pending.len())
    }

    async fn ensure_migrations_table(&self) -> Result<(), MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version BIGINT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                description TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MigrationError::ExecutionError { version: 0, source: e })?;
        Ok(())
    }

    pub async fn get_current_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0)::BIGINT FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(MigrationError::VersionCheckError)?;
        Ok(version)
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<(), MigrationError> {
        let err = |e: sqlx::Error| MigrationError::ExecutionError {
            version: migration.version,
            source: e,
        };

        let mut tx = self.pool.begin().await.map_err(err)?;
        sqlx::raw_sql(&migration.render(self.dimension))
            .execute(&mut *tx)
            .await
            .map_err(err)?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(err)?;
        tx.commit().await.map_err(err)?;
        Ok(())
    }

    /// The table was created for one dimension; a store opened with another
    /// would fail on every insert.
    async fn check_dimension(&self) -> Result<(), MigrationError> {
        let stored: Option<(i32,)> = sqlx::query_as(
            "SELECT atttypmod FROM pg_attribute
             WHERE attrelid = 'corpus_chunks'::regclass AND attname = 'embedding'",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(MigrationError::VersionCheckError)?;

        match stored {
            Some((stored,)) if stored > 0 && usize::try_from(stored).ok() != Some(self.dimension) => {
                Err(MigrationError::DimensionMismatch {
                    stored: usize::try_from(stored).unwrap_or_default(),
                    configured: self.dimension,
                })
            }
            _ => Ok(()),
        }
    }

    async fn ensure_ann_index(&self, lists: u32) -> Result<(), MigrationError> {
        if self.dimension > IVFFLAT_MAX_DIMENSION {
            warn!(
                dimension = self.dimension,
                limit = IVFFLAT_MAX_DIMENSION,
                "dimension exceeds the IVFFlat limit, similarity search will scan sequentially"
            );
            return Ok(());
        }

        let ddl = format!(
            "CREATE INDEX IF NOT EXISTS corpus_chunks_embedding_idx
             ON corpus_chunks USING ivfflat (embedding vector_cosine_ops)
             WITH (lists = {})",
            lists.max(1)
        );
        sqlx::raw_sql(&ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| MigrationError::ExecutionError { version: 0, source: e })?;
        Ok(())
    }
}
