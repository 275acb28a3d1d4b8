//! Embedding service for chunk indexing and query embedding.
//!
//! Splits work into provider-sized batches, runs a bounded number of
//! batches concurrently, and reassembles results in input order. Each
//! request is rate limited, given a timeout, and retried on transient
//! failure.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Chunk, EmbeddedChunk, EmbeddingConfig};
use crate::domain::ports::embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};
use crate::infrastructure::http::{with_timeout, RateLimiter, RetryPolicy};

/// Configuration for the embedding service.
#[derive(Debug, Clone)]
pub struct EmbeddingServiceConfig {
    /// Texts per provider call, further capped by the provider's own limit.
    pub batch_size: usize,
    /// Batches in flight at once.
    pub concurrency: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self::from(&EmbeddingConfig::default())
    }
}

impl From<&EmbeddingConfig> for EmbeddingServiceConfig {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            concurrency: config.concurrency,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Embedding service that orchestrates embedding generation.
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    config: EmbeddingServiceConfig,
    retry: RetryPolicy,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl EmbeddingService {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        config: EmbeddingServiceConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            config,
            retry,
            rate_limiter: None,
        }
    }

    pub fn with_defaults(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(provider, EmbeddingServiceConfig::default(), RetryPolicy::default())
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Provider name for diagnostics.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Embedding dimension.
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Effective texts per request.
    pub fn batch_size(&self) -> usize {
        self.config
            .batch_size
            .min(self.provider.max_batch_size())
            .max(1)
    }

    /// Embed a search query.
    #[instrument(skip_all, fields(provider = self.provider.name()))]
    pub async fn embed_query(&self, text: &str) -> DomainResult<Vec<f32>> {
        let vector = self
            .retry
            .execute("embed_query", || async move {
                self.acquire().await;
                with_timeout(self.config.timeout, "embedding request", self.provider.embed(text)).await
            })
            .await?;
        self.check_dimension(&vector, "query")?;
        Ok(vector)
    }

    /// Embed multiple inputs, one output per input in input order.
    pub async fn embed_many(&self, inputs: &[EmbeddingInput]) -> DomainResult<Vec<EmbeddingOutput>> {
        stream::iter(inputs.chunks(self.batch_size()))
            .map(|batch| self.embed_batch(batch))
            .buffered(self.config.concurrency.max(1))
            .try_concat()
            .await
    }

    /// Embedded chunks, one item per batch, in chunk order.
    pub fn embed_chunk_batches<'a>(
        &'a self,
        chunks: &'a [Chunk],
    ) -> impl Stream<Item = DomainResult<Vec<EmbeddedChunk>>> + 'a {
        stream::iter(chunks.chunks(self.batch_size()))
            .map(move |batch| self.embed_chunk_batch(batch))
            .buffered(self.config.concurrency.max(1))
    }

    /// Embed every chunk; one vector per chunk in the same order.
    pub async fn embed_chunks(&self, chunks: &[Chunk]) -> DomainResult<Vec<EmbeddedChunk>> {
        self.embed_chunk_batches(chunks).try_concat().await
    }

    async fn embed_chunk_batch(&self, batch: &[Chunk]) -> DomainResult<Vec<EmbeddedChunk>> {
        let inputs: Vec<EmbeddingInput> = batch
            .iter()
            .map(|chunk| EmbeddingInput::new(&chunk.chunk_id, chunk.embedding_text()))
            .collect();
        let outputs = self.embed_batch(&inputs).await?;

        Ok(batch
            .iter()
            .zip(outputs)
            .map(|(chunk, output)| EmbeddedChunk::new(chunk.clone(), output.vector))
            .collect())
    }

    async fn embed_batch(&self, inputs: &[EmbeddingInput]) -> DomainResult<Vec<EmbeddingOutput>> {
        let outputs = self
            .retry
            .execute("embed_batch", || async move {
                self.acquire().await;
                with_timeout(
                    self.config.timeout,
                    "embedding request",
                    self.provider.embed_batch(inputs),
                )
                .await
            })
            .await?;

        if outputs.len() != inputs.len() {
            return Err(DomainError::DataIntegrity(format!(
                "{} returned {} embeddings for {} inputs",
                self.provider.name(),
                outputs.len(),
                inputs.len()
            )));
        }
        for (input, output) in inputs.iter().zip(&outputs) {
            if input.id != output.id {
                return Err(DomainError::DataIntegrity(format!(
                    "{} returned embedding for {} in place of {}",
                    self.provider.name(),
                    output.id,
                    input.id
                )));
            }
            self.check_dimension(&output.vector, &output.id)?;
        }

        debug!(batch = inputs.len(), "embedded batch");
        Ok(outputs)
    }

    fn check_dimension(&self, vector: &[f32], what: &str) -> DomainResult<()> {
        let expected = self.provider.dimension();
        if vector.len() == expected {
            Ok(())
        } else {
            Err(DomainError::DataIntegrity(format!(
                "embedding for {what} has dimension {}, expected {expected}",
                vector.len()
            )))
        }
    }

    async fn acquire(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }
    }
}
