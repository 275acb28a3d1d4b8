//! Embedding provider adapters.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;

use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{EmbeddingConfig, EmbeddingProviderKind};
use crate::domain::ports::EmbeddingProvider;

/// Build the provider selected by `embedding.provider`.
pub fn provider_from_config(config: &EmbeddingConfig) -> DomainResult<Arc<dyn EmbeddingProvider>> {
    Ok(match config.provider {
        EmbeddingProviderKind::Gemini => Arc::new(GeminiEmbeddingProvider::new(config)?),
        EmbeddingProviderKind::OpenAi => Arc::new(OpenAiEmbeddingProvider::new(config)?),
    })
}
