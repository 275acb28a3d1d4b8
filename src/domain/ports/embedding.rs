//! Embedding provider port for semantic vector generation.
//!
//! Defines the trait for embedding providers that convert text into
//! dense vector representations for similarity search.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// A single embedding request item.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    /// Client-side ID for correlation (the chunk id when indexing).
    pub id: String,
    /// Text to embed.
    pub text: String,
}

impl EmbeddingInput {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A single embedding result.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// Correlation ID matching the input.
    pub id: String,
    /// The embedding vector.
    pub vector: Vec<f32>,
}

/// Trait for embedding providers.
///
/// `embed_batch` must return one output per input, in input order.
/// Transport failures map to `DomainError::Transient`; rejected requests
/// (bad key, invalid input) map to `DomainError::Upstream`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "gemini", "openai").
    fn name(&self) -> &'static str;

    /// Embedding dimension for this provider/model.
    fn dimension(&self) -> usize;

    /// Generate embeddings for multiple texts in a single API call.
    async fn embed_batch(&self, inputs: &[EmbeddingInput]) -> DomainResult<Vec<EmbeddingOutput>>;

    /// Maximum number of texts per single API call.
    fn max_batch_size(&self) -> usize;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        let outputs = self.embed_batch(&[EmbeddingInput::new("query", text)]).await?;
        outputs
            .into_iter()
            .next()
            .map(|output| output.vector)
            .ok_or_else(|| {
                crate::domain::errors::DomainError::DataIntegrity(format!(
                    "{} returned no embedding for a single input",
                    self.name()
                ))
            })
    }
}
