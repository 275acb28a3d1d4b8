//! Hybrid retrieval: exact-reference lookup merged with semantic search.
//!
//! Exact matches always rank first with similarity 1.0; semantic matches
//! fill the remaining slots in descending similarity. The three stages
//! are public so callers and tests can exercise them separately.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{RetrievalConfig, SearchResult};
use crate::domain::ports::VectorStore;
use crate::services::reference_extractor::ReferenceExtractor;

/// Semantic candidates fetched per result slot before per-reference dedup
const SEMANTIC_OVERSAMPLE: usize = 3;

/// Per-call overrides of the configured retrieval settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub semantic_threshold: f32,
    pub max_results: usize,
}

impl From<&RetrievalConfig> for SearchOptions {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            semantic_threshold: config.semantic_threshold,
            max_results: config.max_results,
        }
    }
}

pub struct RetrievalService {
    store: Arc<dyn VectorStore>,
    extractor: ReferenceExtractor,
    defaults: SearchOptions,
}

impl RetrievalService {
    pub fn new(store: Arc<dyn VectorStore>, config: &RetrievalConfig) -> Self {
        Self {
            store,
            extractor: ReferenceExtractor::new(),
            defaults: SearchOptions::from(config),
        }
    }

    pub const fn defaults(&self) -> SearchOptions {
        self.defaults
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// The trimmed query itself plus any canonical reference recognized
    /// in it, without case-insensitive duplicates.
    pub fn candidate_references(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let mut candidates = vec![query.to_string()];
        if let Some(reference) = self.extractor.extract(query) {
            if !reference.eq_ignore_ascii_case(query) {
                candidates.push(reference);
            }
        }
        candidates
    }

    /// Chunks whose reference equals a candidate reference, in candidate
    /// order then chunk order.
    pub async fn exact_matches(&self, query: &str) -> DomainResult<Vec<SearchResult>> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for reference in self.candidate_references(query) {
            let matches = self
                .store
                .query_by_reference(&reference)
                .await
                .map_err(|e| self.unavailable(e))?;
            results.extend(
                matches
                    .into_iter()
                    .filter(|r| seen.insert(r.chunk_id.clone())),
            );
        }

        Ok(results)
    }

    /// Nearest neighbours above `threshold`, at most one per reference,
    /// excluding any reference already matched exactly.
    pub async fn semantic_matches(
        &self,
        query_vector: &[f32],
        exact: &[SearchResult],
        options: SearchOptions,
    ) -> DomainResult<Vec<SearchResult>> {
        if options.max_results == 0 {
            return Ok(Vec::new());
        }

        // Several chunks of one reference may crowd the top of the
        // candidate list; over-fetch so each reference can still get a slot.
        let top_k = (options.max_results + exact.len()).saturating_mul(SEMANTIC_OVERSAMPLE);
        let candidates = self
            .store
            .query(query_vector, top_k, options.semantic_threshold)
            .await
            .map_err(|e| self.unavailable(e))?;

        let mut seen_refs: HashSet<String> =
            exact.iter().map(|r| r.reference.to_lowercase()).collect();
        let matched_ids: HashSet<&str> = exact.iter().map(|r| r.chunk_id.as_str()).collect();

        // Candidates arrive best first, so the first chunk kept per
        // reference is its highest-scoring one.
        Ok(candidates
            .into_iter()
            .filter(|r| {
                !matched_ids.contains(r.chunk_id.as_str())
                    && seen_refs.insert(r.reference.to_lowercase())
            })
            .take(options.max_results)
            .collect())
    }

    /// Full hybrid search with the configured threshold and result cap.
    pub async fn hybrid_search(
        &self,
        query: &str,
        query_vector: &[f32],
    ) -> DomainResult<Vec<SearchResult>> {
        self.hybrid_search_with(query, query_vector, self.defaults).await
    }

    #[instrument(skip(self, query_vector), fields(backend = self.store.backend()))]
    pub async fn hybrid_search_with(
        &self,
        query: &str,
        query_vector: &[f32],
        options: SearchOptions,
    ) -> DomainResult<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let exact = self.exact_matches(query).await?;
        let semantic = self.semantic_matches(query_vector, &exact, options).await?;
        debug!(exact = exact.len(), semantic = semantic.len(), "hybrid search");

        Ok(merge(exact, semantic, options.max_results))
    }

    fn unavailable(&self, err: DomainError) -> DomainError {
        match err {
            DomainError::DataIntegrity(_) => err,
            other => {
                warn!(backend = self.store.backend(), error = %other, "vector store failed");
                DomainError::RetrievalUnavailable(format!("{} store: {other}", self.store.backend()))
            }
        }
    }
}

/// Exact results then semantic results, without repeated chunk ids,
/// truncated to `max_results`.
pub fn merge(
    exact: Vec<SearchResult>,
    semantic: Vec<SearchResult>,
    max_results: usize,
) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    exact
        .into_iter()
        .chain(semantic)
        .filter(|r| seen.insert(r.chunk_id.clone()))
        .take(max_results)
        .collect()
}
