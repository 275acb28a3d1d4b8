//! Answer service grounding and degradation.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{keyword_embeddings, sample_embedded_chunks, RecordingGenerator, UnreachableStore, DIMENSION};
use guezi::adapters::local_index::LocalIndex;
use guezi::domain::errors::{DomainError, DomainResult};
use guezi::domain::models::{AnswerLanguage, Grounding, RetrievalConfig};
use guezi::domain::ports::{AnswerGenerator, GenerationRequest, VectorStore};
use guezi::services::{AnswerService, RetrievalService};
use tempfile::TempDir;

async fn grounded_service(generator: Arc<dyn AnswerGenerator>) -> (TempDir, AnswerService) {
    let dir = tempfile::tempdir().unwrap();
    let index = LocalIndex::open(dir.path(), "breslov", DIMENSION).await.unwrap();
    index.upsert_batch(&sample_embedded_chunks()).await.unwrap();
    index.flush().await.unwrap();

    let retrieval = Arc::new(RetrievalService::new(Arc::new(index), &RetrievalConfig::default()));
    (dir, AnswerService::new(keyword_embeddings(), retrieval, generator))
}

#[tokio::test]
async fn test_answer_is_grounded_on_retrieved_passages() {
    let generator = Arc::new(RecordingGenerator::new());
    let (_dir, service) = grounded_service(generator.clone()).await;

    let answer = service.answer("How can I find joy?").await.unwrap();

    assert_eq!(answer.grounding, Grounding::Grounded);
    assert!(!answer.sources.is_empty());
    assert_eq!(answer.sources[0].reference, "Likutei Moharan, Part II 24");

    let requests = generator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].question, "How can I find joy?");
    assert_eq!(requests[0].context.len(), answer.sources.len());
    assert_eq!(answer.text, format!("answer with {} source(s)", answer.sources.len()));
}

#[tokio::test]
async fn test_requested_language_reaches_generator() {
    let generator = Arc::new(RecordingGenerator::new());
    let (_dir, service) = grounded_service(generator.clone()).await;

    service
        .answer_in("Comment trouver la joie ?", Some(AnswerLanguage::Fr))
        .await
        .unwrap();
    service.answer("How can I find joy?").await.unwrap();

    let requests = generator.requests();
    assert_eq!(requests[0].language, Some(AnswerLanguage::Fr));
    assert_eq!(requests[1].language, None);
}

#[tokio::test]
async fn test_no_matches_still_calls_generator() {
    let generator = Arc::new(RecordingGenerator::new());
    let (_dir, service) = grounded_service(generator.clone()).await;

    let answer = service.answer("quantum chromodynamics").await.unwrap();

    assert_eq!(answer.grounding, Grounding::NoMatches);
    assert!(answer.sources.is_empty());
    assert!(!generator.requests()[0].is_grounded());
}

#[tokio::test]
async fn test_empty_question_skips_retrieval() {
    let generator = Arc::new(RecordingGenerator::new());
    let retrieval = Arc::new(RetrievalService::new(
        Arc::new(UnreachableStore { dimension: DIMENSION }),
        &RetrievalConfig::default(),
    ));
    let service = AnswerService::new(keyword_embeddings(), retrieval, generator.clone());

    let answer = service.answer("   ").await.unwrap();

    // The unreachable store was never touched, so this is not Unavailable.
    assert_eq!(answer.grounding, Grounding::NoMatches);
    assert_eq!(generator.requests().len(), 1);
}

#[tokio::test]
async fn test_unreachable_store_degrades_to_ungrounded_answer() {
    let generator = Arc::new(RecordingGenerator::new());
    let store: Arc<dyn VectorStore> = Arc::new(UnreachableStore { dimension: DIMENSION });
    let retrieval = Arc::new(RetrievalService::new(store, &RetrievalConfig::default()));
    let service = AnswerService::new(keyword_embeddings(), retrieval, generator.clone());

    let answer = service.answer("What is hitbodedut?").await.unwrap();

    assert!(matches!(answer.grounding, Grounding::Unavailable(ref reason) if reason.contains("connection refused")));
    assert!(answer.sources.is_empty());
    let requests = generator.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].context.is_empty());
}

struct FailingGenerator;

#[async_trait]
impl AnswerGenerator for FailingGenerator {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn generate(&self, _request: &GenerationRequest) -> DomainResult<String> {
        Err(DomainError::Upstream("gemini: invalid API key".to_string()))
    }
}

#[tokio::test]
async fn test_generator_failure_is_returned() {
    let (_dir, service) = grounded_service(Arc::new(FailingGenerator)).await;

    let err = service.answer("How can I find joy?").await.unwrap_err();
    assert!(matches!(err, DomainError::Upstream(_)));
}
