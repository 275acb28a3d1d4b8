//! Common test utilities for integration tests
//!
//! Deterministic test doubles for the ports plus a small Breslov corpus.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use guezi::domain::errors::{DomainError, DomainResult};
use guezi::domain::models::{Chunk, Document, EmbeddedChunk, SearchResult};
use guezi::domain::ports::{
    AnswerGenerator, EmbeddingInput, EmbeddingOutput, EmbeddingProvider, GenerationRequest,
    VectorStore,
};
use guezi::services::EmbeddingService;

/// Keywords that span the embedding space of [`KeywordEmbedder`].
pub const KEYWORDS: [&str; 7] = ["joy", "prayer", "faith", "truth", "torah", "heart", "song"];

/// Dimension of [`KeywordEmbedder`] vectors: one per keyword plus a
/// catch-all axis for text that mentions none of them.
pub const DIMENSION: usize = KEYWORDS.len() + 1;

/// Embeds text as keyword counts. Texts sharing keywords are similar;
/// texts with no keywords in common have similarity 0.
#[derive(Debug, Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect();
        let matched = vector.iter().any(|v| *v > 0.0);
        vector.push(if matched { 0.0 } else { 1.0 });
        vector
    }

    /// Number of `embed_batch` calls served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    async fn embed_batch(&self, inputs: &[EmbeddingInput]) -> DomainResult<Vec<EmbeddingOutput>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs
            .iter()
            .map(|input| EmbeddingOutput {
                id: input.id.clone(),
                vector: Self::vector(&input.text),
            })
            .collect())
    }

    fn max_batch_size(&self) -> usize {
        4
    }
}

/// Generator that records every request and answers with a fixed text.
#[derive(Debug, Default)]
pub struct RecordingGenerator {
    requests: Mutex<Vec<GenerationRequest>>,
}

impl RecordingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn generate(&self, request: &GenerationRequest) -> DomainResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(format!("answer with {} source(s)", request.context.len()))
    }
}

/// A store whose backend is unreachable.
#[derive(Debug)]
pub struct UnreachableStore {
    pub dimension: usize,
}

impl UnreachableStore {
    fn down<T>() -> DomainResult<T> {
        Err(DomainError::Transient("connection refused".to_string()))
    }
}

#[async_trait]
impl VectorStore for UnreachableStore {
    fn backend(&self) -> &'static str {
        "unreachable"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, _chunk: &Chunk, _vector: &[f32]) -> DomainResult<()> {
        Self::down()
    }

    async fn upsert_batch(&self, _items: &[EmbeddedChunk]) -> DomainResult<()> {
        Self::down()
    }

    async fn query(&self, _vector: &[f32], _top_k: usize, _threshold: f32) -> DomainResult<Vec<SearchResult>> {
        Self::down()
    }

    async fn query_by_reference(&self, _reference: &str) -> DomainResult<Vec<SearchResult>> {
        Self::down()
    }

    async fn remove_references(&self, _references: &[String]) -> DomainResult<usize> {
        Self::down()
    }

    async fn count(&self) -> DomainResult<usize> {
        Self::down()
    }

    async fn clear(&self) -> DomainResult<()> {
        Self::down()
    }

    async fn flush(&self) -> DomainResult<()> {
        Self::down()
    }

    async fn close(&self) -> DomainResult<()> {
        Ok(())
    }
}

/// Embedding service over a [`KeywordEmbedder`].
pub fn keyword_embeddings() -> Arc<EmbeddingService> {
    Arc::new(EmbeddingService::with_defaults(Arc::new(KeywordEmbedder::new())))
}

/// A handful of short Breslov passages, one chunk each at default sizes.
pub fn sample_documents() -> Vec<Document> {
    vec![
        Document::new(
            "Likutei Moharan",
            "Likutei Moharan 1",
            "אשרי תמימי דרך ההולכים בתורת ה׳",
            "Happy are those whose way is perfect, who walk in the Torah of God.",
        ),
        Document::new(
            "Likutei Moharan",
            "Likutei Moharan 2",
            "עקר כח המשיח הוא תפלה",
            "The main weapon of Mashiach is prayer, which comes from the heart.",
        ),
        Document::new(
            "Likutei Moharan, Part II",
            "Likutei Moharan, Part II 24",
            "מצוה גדולה להיות בשמחה תמיד",
            "It is a great mitzvah to always be in joy. Joy opens the heart.",
        ),
        Document::new(
            "Sichot HaRan",
            "Sichot HaRan 32",
            "",
            "Faith is a very great thing; strengthen your faith with truth.",
        ),
        Document::new(
            "Likutei Tefilot",
            "Likutei Tefilot 1",
            "",
            "Master of the world, grant me a new song of prayer and joy.",
        ),
    ]
}

/// One chunk per sample document, each embedded with [`KeywordEmbedder`].
pub fn sample_embedded_chunks() -> Vec<EmbeddedChunk> {
    sample_documents()
        .iter()
        .map(|doc| {
            let chunk = Chunk::new(&doc.reference, &doc.title, 0, 1, doc.body());
            let vector = KeywordEmbedder::vector(&chunk.embedding_text());
            EmbeddedChunk::new(chunk, vector)
        })
        .collect()
}

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
