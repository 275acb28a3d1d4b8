//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - TextSource: fetching bilingual documents from a text API
//! - EmbeddingProvider: turning text into vectors
//! - VectorStore: persisting chunk/vector pairs and similarity search
//! - AnswerGenerator: producing an answer from a question and retrieved context
//!
//! These traits keep the services independent of specific backends.

pub mod answer_generator;
pub mod embedding;
pub mod text_source;
pub mod vector_store;

pub use answer_generator::{AnswerGenerator, ContextPassage, GenerationRequest};
pub use embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};
pub use text_source::TextSource;
pub use vector_store::VectorStore;
