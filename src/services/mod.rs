//! Application services.
//!
//! Services depend only on domain ports and are wired together in
//! [`crate::infrastructure::setup::AppContext`].

pub mod answer_service;
pub mod chunker;
pub mod embedding_service;
pub mod fetch_service;
pub mod indexing_service;
pub mod prompt;
pub mod reference_extractor;
pub mod retrieval_service;

pub use answer_service::AnswerService;
pub use chunker::SemanticChunker;
pub use embedding_service::{EmbeddingService, EmbeddingServiceConfig};
pub use fetch_service::{fetch_corpus, FetchFailure, FetchReport};
pub use indexing_service::{IndexOptions, IndexReport, IndexingService};
pub use prompt::PromptBuilder;
pub use reference_extractor::ReferenceExtractor;
pub use retrieval_service::{merge, RetrievalService, SearchOptions};
