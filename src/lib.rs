//! Guezi - hybrid retrieval over the Breslov corpus
//!
//! Guezi fetches bilingual texts from Sefaria, splits them into chunks,
//! embeds the chunks, and stores them in a vector index. At query time a
//! hybrid search merges exact citation matches with semantic neighbours,
//! and the results ground an external answer generator.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): corpus models, port traits, error taxonomy
//! - **Service Layer** (`services`): chunking, embedding, indexing, retrieval, answering
//! - **Adapter Layer** (`adapters`): Sefaria, embedding APIs, Gemini, local index, pgvector
//! - **Infrastructure Layer** (`infrastructure`): config, logging, HTTP retry, wiring
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use guezi::{AppContext, ConfigLoader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = AppContext::from_config(ConfigLoader::load()?).await?;
//!     let vector = ctx.embeddings().embed_query("Likutei Moharan 1").await?;
//!     let results = ctx.retrieval().hybrid_search("Likutei Moharan 1", &vector).await?;
//!     ctx.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Answer, Chunk, ChunkingConfig, Config, CorpusSnapshot, Document, EmbeddedChunk, Grounding,
    MatchType, SearchResult,
};
pub use domain::ports::{AnswerGenerator, EmbeddingProvider, TextSource, VectorStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::setup::AppContext;
pub use services::{
    AnswerService, EmbeddingService, IndexingService, RetrievalService, SemanticChunker,
};
