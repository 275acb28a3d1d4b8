use async_trait::async_trait;
use pgvector::Vector;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use super::connection::{create_pool, verify_connection, PoolConfig};
use super::migrations::Migrator;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::search::clamp_similarity;
use crate::domain::models::{Chunk, EmbeddedChunk, MatchType, PostgresConfig, SearchResult};
use crate::domain::ports::VectorStore;

const UPSERT_SQL: &str = "
    INSERT INTO corpus_chunks
        (chunk_id, reference, title, chunk_index, total_chunks,
         original_text, translated_text, text, embedding)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
    ON CONFLICT (chunk_id) DO UPDATE SET
        reference = EXCLUDED.reference,
        title = EXCLUDED.title,
        chunk_index = EXCLUDED.chunk_index,
        total_chunks = EXCLUDED.total_chunks,
        original_text = EXCLUDED.original_text,
        translated_text = EXCLUDED.translated_text,
        text = EXCLUDED.text,
        embedding = EXCLUDED.embedding,
        updated_at = now()";

#[derive(Debug, sqlx::FromRow)]
struct ChunkRow {
    chunk_id: String,
    reference: String,
    title: String,
    chunk_index: i32,
    total_chunks: i32,
    text: String,
    similarity: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct HybridRow {
    #[sqlx(flatten)]
    chunk: ChunkRow,
    match_type: String,
}

impl ChunkRow {
    #[allow(clippy::cast_possible_truncation)]
    fn into_result(self, match_type: MatchType) -> SearchResult {
        let similarity = match match_type {
            MatchType::ExactReference => 1.0,
            MatchType::Semantic => clamp_similarity(self.similarity as f32),
        };
        SearchResult {
            chunk_id: self.chunk_id,
            reference: self.reference,
            title: self.title,
            chunk_index: usize::try_from(self.chunk_index).unwrap_or_default(),
            total_chunks: usize::try_from(self.total_chunks).unwrap_or_default(),
            text: self.text,
            similarity,
            match_type,
        }
    }
}

/// pgvector-backed store over the `corpus_chunks` table
///
/// Writes are visible as soon as they commit, so `flush` only has
/// meaning for the local index.
pub struct PgVectorStore {
    pool: PgPool,
    dimension: usize,
}

impl PgVectorStore {
    /// Connect, run pending migrations, and check the stored dimension.
    #[instrument(skip_all, fields(dimension = dimension))]
    pub async fn connect(config: &PostgresConfig, dimension: usize) -> DomainResult<Self> {
        let url = config.url.as_deref().ok_or_else(|| {
            DomainError::Configuration(
                "store.backend is postgres but no URL is set; configure store.postgres.url or DATABASE_URL"
                    .to_string(),
            )
        })?;

        let pool = create_pool(url, Some(PoolConfig::from(config))).await?;
        verify_connection(&pool).await?;

        let applied = Migrator::new(pool.clone(), dimension)
            .run(config.ivfflat_lists)
            .await?;
        info!(applied, "postgres store ready");

        Ok(Self { pool, dimension })
    }

    fn check_dimension(&self, vector: &[f32], what: &str) -> DomainResult<()> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(DomainError::DataIntegrity(format!(
                "{what} has dimension {}, store dimension is {}",
                vector.len(),
                self.dimension
            )))
        }
    }

    /// Exact rows for `reference` followed by semantic rows for other
    /// references, in one round trip through `hybrid_search_corpus_chunks`.
    pub async fn hybrid_search_rpc(
        &self,
        reference: &str,
        vector: &[f32],
        threshold: f32,
        match_count: usize,
    ) -> DomainResult<Vec<SearchResult>> {
        self.check_dimension(vector, "query vector")?;

        let rows: Vec<HybridRow> =
            sqlx::query_as("SELECT * FROM hybrid_search_corpus_chunks($1, $2, $3, $4)")
                .bind(reference)
                .bind(Vector::from(vector.to_vec()))
                .bind(f64::from(threshold))
                .bind(to_sql_count(match_count))
                .fetch_all(&self.pool)
                .await?;

        let mut results = rows
            .into_iter()
            .map(|row| {
                let match_type = row
                    .match_type
                    .parse::<MatchType>()
                    .map_err(DomainError::DataIntegrity)?;
                Ok(row.chunk.into_result(match_type))
            })
            .collect::<DomainResult<Vec<_>>>()?;

        // UNION ALL order is not guaranteed; keep exact rows first
        results.sort_by_key(|r| !r.is_exact());
        Ok(results)
    }
}

fn to_sql_int(value: usize, what: &str) -> DomainResult<i32> {
    i32::try_from(value)
        .map_err(|_| DomainError::ValidationFailed(format!("{what} {value} exceeds the database range")))
}

fn to_sql_count(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[async_trait]
impl VectorStore for PgVectorStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, chunk: &Chunk, vector: &[f32]) -> DomainResult<()> {
        self.upsert_batch(&[EmbeddedChunk::new(chunk.clone(), vector.to_vec())])
            .await
    }

    async fn upsert_batch(&self, items: &[EmbeddedChunk]) -> DomainResult<()> {
        for item in items {
            self.check_dimension(&item.vector, &format!("vector for {}", item.chunk.chunk_id))?;
        }

        let mut tx = self.pool.begin().await?;
        for item in items {
            let chunk = &item.chunk;
            sqlx::query(UPSERT_SQL)
                .bind(&chunk.chunk_id)
                .bind(&chunk.reference)
                .bind(&chunk.title)
                .bind(to_sql_int(chunk.chunk_index, "chunk index")?)
                .bind(to_sql_int(chunk.total_chunks, "chunk total")?)
                .bind(chunk.original_text.as_deref())
                .bind(chunk.translated_text.as_deref())
                .bind(&chunk.text)
                .bind(Vector::from(item.vector.clone()))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(rows = items.len(), "upserted chunks");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> DomainResult<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(vector, "query vector")?;

        let rows: Vec<ChunkRow> = sqlx::query_as("SELECT * FROM match_corpus_chunks($1, $2, $3)")
            .bind(Vector::from(vector.to_vec()))
            .bind(f64::from(threshold))
            .bind(to_sql_count(top_k))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_result(MatchType::Semantic))
            .collect())
    }

    async fn query_by_reference(&self, reference: &str) -> DomainResult<Vec<SearchResult>> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<ChunkRow> = sqlx::query_as(
            "SELECT chunk_id, reference, title, chunk_index, total_chunks, text,
                    1.0::FLOAT8 AS similarity
             FROM corpus_chunks
             WHERE lower(reference) = lower($1)
             ORDER BY chunk_index ASC, id ASC",
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_result(MatchType::ExactReference))
            .collect())
    }

    async fn remove_references(&self, references: &[String]) -> DomainResult<usize> {
        let wanted: Vec<String> = references.iter().map(|r| r.trim().to_lowercase()).collect();
        if wanted.is_empty() {
            return Ok(0);
        }
        let removed = sqlx::query("DELETE FROM corpus_chunks WHERE lower(reference) = ANY($1)")
            .bind(&wanted)
            .execute(&self.pool)
            .await?
            .rows_affected();
        debug!(references = wanted.len(), removed, "removed stored references");
        Ok(usize::try_from(removed).unwrap_or_default())
    }

    async fn count(&self) -> DomainResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM corpus_chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn clear(&self) -> DomainResult<()> {
        sqlx::query("TRUNCATE corpus_chunks RESTART IDENTITY")
            .execute(&self.pool)
            .await?;
        info!("cleared corpus_chunks");
        Ok(())
    }

    async fn flush(&self) -> DomainResult<()> {
        Ok(())
    }

    async fn close(&self) -> DomainResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
