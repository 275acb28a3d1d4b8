//! Fetch-free indexing pipeline: chunk, embed, store, then query.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{keyword_embeddings, sample_documents, KeywordEmbedder, UnreachableStore, DIMENSION};
use guezi::adapters::local_index::LocalIndex;
use guezi::adapters::sefaria::text::flatten;
use guezi::domain::models::{ChunkingConfig, Config, Document, MatchType, RetrievalConfig};
use guezi::domain::ports::VectorStore;
use guezi::infrastructure::setup::AppContext;
use guezi::services::{IndexOptions, IndexingService, RetrievalService, SemanticChunker};
use serde_json::json;

async fn open_index(dir: &std::path::Path) -> Arc<LocalIndex> {
    Arc::new(LocalIndex::open(dir, "breslov", DIMENSION).await.unwrap())
}

fn indexer(store: Arc<dyn VectorStore>) -> IndexingService {
    IndexingService::new(SemanticChunker::new(), keyword_embeddings(), store)
}

fn long_document() -> Document {
    let paragraph = "Joy is the foundation of prayer. A person must search for the good point in himself. ";
    let english = (0..12).map(|_| paragraph.repeat(3)).collect::<Vec<_>>().join("\n\n");
    Document::new("Likutei Moharan", "Likutei Moharan 282", "", english)
}

#[tokio::test]
async fn test_index_documents_reports_counts() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_index(dir.path()).await;

    let mut documents = sample_documents();
    documents.push(Document::new("Sichot HaRan", "Sichot HaRan 99", " ", ""));
    documents.push(long_document());

    let mut progress = Vec::new();
    let report = indexer(store.clone())
        .index_documents(&documents, IndexOptions::default(), |done, total| {
            progress.push((done, total));
        })
        .await
        .unwrap();

    assert_eq!(report.documents, 7);
    assert_eq!(report.skipped_documents, 1);
    assert!(report.chunks > 6, "long document should split, got {}", report.chunks);
    assert_eq!(report.vectors_stored, report.chunks);
    assert_eq!(report.store_count, report.chunks);
    assert_eq!(progress.last(), Some(&(report.chunks, report.chunks)));

    let chunks = store.query_by_reference("Likutei Moharan 282").await.unwrap();
    let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
    assert!(chunks.iter().all(|c| c.total_chunks == chunks.len()));
}

#[tokio::test]
async fn test_reindexing_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_index(dir.path()).await;
    let documents = sample_documents();
    let service = indexer(store.clone());

    let first = service
        .index_documents(&documents, IndexOptions::default(), |_, _| {})
        .await
        .unwrap();
    let second = service
        .index_documents(&documents, IndexOptions::default(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(first.store_count, second.store_count);
    assert_eq!(store.count().await.unwrap(), documents.len());

    let results = store
        .query(&KeywordEmbedder::vector("joy prayer faith truth torah heart song"), 100, 0.0)
        .await
        .unwrap();
    let ids: HashSet<&str> = results.iter().map(|r| r.chunk_id.as_str()).collect();
    assert_eq!(ids.len(), results.len());
}

#[tokio::test]
async fn test_rebuild_drops_documents_no_longer_in_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_index(dir.path()).await;
    let service = indexer(store.clone());

    service
        .index_documents(&sample_documents(), IndexOptions::default(), |_, _| {})
        .await
        .unwrap();

    let subset = &sample_documents()[..2];
    let report = service
        .index_documents(subset, IndexOptions { rebuild: true }, |_, _| {})
        .await
        .unwrap();

    assert_eq!(report.store_count, 2);
    assert!(store.query_by_reference("Sichot HaRan 32").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reindex_replaces_stale_chunks_of_a_reference() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_index(dir.path()).await;

    let english = [
        "Always be happy, for joy is a great mitzvah.",
        "Even when a person falls, he must strengthen himself in joy.",
        "Prayer said with a glad heart rises higher than prayer said in sadness.",
        "Search for the good point in yourself and sing a new song.",
    ]
    .join("\n\n");
    let documents = vec![Document::new("Sichot HaRan", "Sichot HaRan 2", "", english)];

    let fine = SemanticChunker::with_config(ChunkingConfig {
        target_chunk_size: 100,
        min_chunk_size: 30,
        max_chunk_size: 150,
        overlap_size: 40,
    })
    .unwrap();
    let first = IndexingService::new(fine, keyword_embeddings(), store.clone())
        .index_documents(&documents, IndexOptions::default(), |_, _| {})
        .await
        .unwrap();
    assert!(first.chunks > 1, "small chunks should split, got {}", first.chunks);

    let second = indexer(store.clone())
        .index_documents(&documents, IndexOptions::default(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(second.replaced_chunks, first.chunks);
    assert_eq!(second.store_count, 1);
    let stored = store.query_by_reference("Sichot HaRan 2").await.unwrap();
    let positions: Vec<(usize, usize)> =
        stored.iter().map(|r| (r.chunk_index, r.total_chunks)).collect();
    assert_eq!(positions, vec![(0, 1)]);
}

#[tokio::test]
async fn test_reindex_leaves_other_references_alone() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_index(dir.path()).await;
    let service = indexer(store.clone());

    service
        .index_documents(&sample_documents(), IndexOptions::default(), |_, _| {})
        .await
        .unwrap();
    let report = service
        .index_documents(&sample_documents()[..1], IndexOptions::default(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(report.replaced_chunks, 1);
    assert_eq!(report.store_count, sample_documents().len());
}

#[tokio::test]
async fn test_duplicate_references_keep_first_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_index(dir.path()).await;

    let documents = vec![
        Document::new("Sichot HaRan", "Sichot HaRan 1", "", "First version with joy."),
        Document::new("Sichot HaRan", "Sichot HaRan 1", "", "Second version with faith."),
    ];
    let report = indexer(store.clone())
        .index_documents(&documents, IndexOptions::default(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(report.duplicate_chunks, 1);
    let stored = store.query_by_reference("Sichot HaRan 1").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].text.contains("First version"));
}

#[tokio::test]
async fn test_fetched_book_sections_match_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_index(dir.path()).await;

    let hebrew = json!([["אשרי תמימי דרך", "ההולכים בתורת ה׳"], ["עקר כח המשיח הוא תפלה"]]);
    let english = json!([
        ["Happy are those whose way is perfect,", "who walk in the Torah of God."],
        ["The main weapon of Mashiach is prayer."]
    ]);
    let documents = flatten("Likutei Moharan", "Likutei Moharan", &hebrew, &english);
    assert_eq!(documents.len(), 2);

    indexer(store.clone())
        .index_documents(&documents, IndexOptions::default(), |_, _| {})
        .await
        .unwrap();

    let retrieval = RetrievalService::new(
        store,
        &RetrievalConfig {
            semantic_threshold: 0.4,
            max_results: 5,
        },
    );
    let query = "Likutei Moharan 1";
    let results = retrieval
        .hybrid_search(query, &KeywordEmbedder::vector(query))
        .await
        .unwrap();

    assert_eq!(results[0].reference, "Likutei Moharan 1");
    assert_eq!(results[0].match_type, MatchType::ExactReference);
    assert!(results[0].text.contains("Torah of God"));
}

#[tokio::test]
async fn test_store_failure_aborts_indexing() {
    let store = Arc::new(UnreachableStore { dimension: DIMENSION });
    let result = indexer(store)
        .index_documents(&sample_documents(), IndexOptions::default(), |_, _| {})
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_app_context_wires_indexing_and_search() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.embedding.dimension = DIMENSION;
    config.chunking = ChunkingConfig::small();

    let store: Arc<dyn VectorStore> = open_index(dir.path()).await;
    let ctx = AppContext::with_components(config, store, Arc::new(KeywordEmbedder::new())).unwrap();

    let report = ctx
        .indexing_service()
        .unwrap()
        .index_documents(&sample_documents(), IndexOptions::default(), |_, _| {})
        .await
        .unwrap();
    assert_eq!(report.store_count, 5);

    let vector = ctx.embeddings().embed_query("Sichot HaRan 32").await.unwrap();
    let results = ctx.retrieval().hybrid_search("Sichot HaRan 32", &vector).await.unwrap();
    assert_eq!(results[0].reference, "Sichot HaRan 32");

    ctx.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_app_context_rejects_dimension_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn VectorStore> =
        Arc::new(LocalIndex::open(dir.path(), "breslov", DIMENSION * 2).await.unwrap());

    let result = AppContext::with_components(Config::default(), store, Arc::new(KeywordEmbedder::new()));
    assert!(result.is_err());
}
