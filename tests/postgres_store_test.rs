//! pgvector store against a live database.
//!
//! Ignored by default. Run with a disposable database:
//!
//! ```text
//! GUEZI_TEST_DATABASE_URL=postgres://localhost/guezi_test cargo test --test postgres_store_test -- --ignored
//! ```
//!
//! The store owns a single `corpus_chunks` table, so everything runs in one
//! test to keep the steps from racing each other.

use guezi::adapters::postgres::PgVectorStore;
use guezi::domain::errors::DomainError;
use guezi::domain::models::{Chunk, EmbeddedChunk, MatchType, PostgresConfig};
use guezi::domain::ports::VectorStore;

const DIMENSION: usize = 3;

fn database_url() -> Option<String> {
    std::env::var("GUEZI_TEST_DATABASE_URL").ok()
}

fn embedded(reference: &str, index: usize, total: usize, vector: [f32; 3]) -> EmbeddedChunk {
    let chunk = Chunk::new(reference, "Likutei Moharan", index, total, format!("{reference} part {index}"));
    EmbeddedChunk::new(chunk, vector.to_vec())
}

#[tokio::test]
#[ignore = "requires GUEZI_TEST_DATABASE_URL"]
async fn test_postgres_store_lifecycle() {
    let Some(url) = database_url() else {
        return;
    };
    let config = PostgresConfig {
        url: Some(url),
        ..PostgresConfig::default()
    };

    let store = PgVectorStore::connect(&config, DIMENSION).await.unwrap();
    store.clear().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);

    store
        .upsert_batch(&[
            embedded("Likutei Moharan 1", 0, 2, [1.0, 0.0, 0.0]),
            embedded("Likutei Moharan 1", 1, 2, [0.9, 0.1, 0.0]),
            embedded("Likutei Moharan 2", 0, 1, [0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();
    store.flush().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 3);

    // Upsert by chunk id replaces instead of duplicating
    store
        .upsert(&embedded("Likutei Moharan 2", 0, 1, [0.0, 0.0, 1.0]).chunk, &[0.0, 0.0, 1.0])
        .await
        .unwrap();
    assert_eq!(store.count().await.unwrap(), 3);

    let exact = store.query_by_reference("likutei moharan 1").await.unwrap();
    assert_eq!(exact.len(), 2);
    assert_eq!(exact[0].chunk_index, 0);
    assert!(exact.iter().all(|r| r.match_type == MatchType::ExactReference));
    assert!(exact.iter().all(|r| (r.similarity - 1.0).abs() < f32::EPSILON));

    let semantic = store.query(&[1.0, 0.0, 0.0], 5, 0.5).await.unwrap();
    assert_eq!(semantic.len(), 2);
    assert!(semantic[0].similarity >= semantic[1].similarity);
    assert!(semantic.iter().all(|r| r.reference == "Likutei Moharan 1"));

    let hybrid = store
        .hybrid_search_rpc("Likutei Moharan 2", &[1.0, 0.0, 0.0], 0.5, 5)
        .await
        .unwrap();
    assert_eq!(hybrid[0].reference, "Likutei Moharan 2");
    assert!(hybrid[0].is_exact());
    assert!(hybrid[1..].iter().all(|r| !r.is_exact()));

    let removed = store
        .remove_references(&["LIKUTEI MOHARAN 1".to_string()])
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert!(store.query_by_reference("Likutei Moharan 1").await.unwrap().is_empty());
    assert_eq!(store.count().await.unwrap(), 1);

    let err = store.query(&[1.0, 0.0], 5, 0.5).await.unwrap_err();
    assert!(matches!(err, DomainError::DataIntegrity(_)));

    store.clear().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
    store.close().await.unwrap();

    // Reconnecting with another dimension must not silently reuse the table
    let err = PgVectorStore::connect(&config, DIMENSION + 1).await.err().unwrap();
    assert!(matches!(err, DomainError::DataIntegrity(_)));
}

#[tokio::test]
async fn test_missing_url_is_configuration_error() {
    let err = PgVectorStore::connect(&PostgresConfig::default(), DIMENSION)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DomainError::Configuration(_)));
}
