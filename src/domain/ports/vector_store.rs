//! Vector store port.
//!
//! One interface over the local flat index and the managed Postgres
//! backend. The backend is picked from configuration at startup; services
//! only ever hold an `Arc<dyn VectorStore>`.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Chunk, EmbeddedChunk, SearchResult};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logs and stats ("local", "postgres").
    fn backend(&self) -> &'static str;

    /// Vector dimension the store was created with.
    fn dimension(&self) -> usize;

    /// Persist or replace a chunk and its vector, keyed by `chunk_id`.
    ///
    /// A vector whose length differs from `dimension()` is a
    /// `DomainError::DataIntegrity`.
    async fn upsert(&self, chunk: &Chunk, vector: &[f32]) -> DomainResult<()>;

    /// Upsert many pairs. Later duplicates of a `chunk_id` win.
    async fn upsert_batch(&self, items: &[EmbeddedChunk]) -> DomainResult<()> {
        for item in items {
            self.upsert(&item.chunk, &item.vector).await?;
        }
        Ok(())
    }

    /// Up to `top_k` semantic results with similarity >= `threshold`,
    /// best first. Ties keep the backend's deterministic order.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> DomainResult<Vec<SearchResult>>;

    /// Every chunk whose reference equals `reference` ignoring case,
    /// ordered by chunk index, scored 1.0 as exact-reference matches.
    async fn query_by_reference(&self, reference: &str) -> DomainResult<Vec<SearchResult>>;

    /// Drop every stored chunk whose reference matches one of
    /// `references` ignoring case. Returns how many were removed.
    ///
    /// Re-indexing a reference calls this first, so chunks left over from
    /// an older, longer split do not outlive it.
    async fn remove_references(&self, references: &[String]) -> DomainResult<usize>;

    /// Number of stored chunks visible to queries.
    async fn count(&self) -> DomainResult<usize>;

    /// Remove every stored chunk (full rebuild).
    async fn clear(&self) -> DomainResult<()>;

    /// Make pending writes durable and visible to queries.
    async fn flush(&self) -> DomainResult<()>;

    /// Flush and release resources.
    async fn close(&self) -> DomainResult<()>;
}
