//! Offline indexing pipeline: chunk, embed, and store a corpus.

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Chunk, Document};
use crate::domain::ports::VectorStore;
use crate::services::chunker::SemanticChunker;
use crate::services::embedding_service::EmbeddingService;

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    /// Clear the store before indexing instead of replacing only the
    /// references being indexed
    pub rebuild: bool,
}

/// Outcome of an indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub documents: usize,
    pub skipped_documents: usize,
    pub chunks: usize,
    pub duplicate_chunks: usize,
    /// Previously stored chunks replaced by this run
    pub replaced_chunks: usize,
    pub vectors_stored: usize,
    pub store_count: usize,
}

pub struct IndexingService {
    chunker: SemanticChunker,
    embeddings: Arc<EmbeddingService>,
    store: Arc<dyn VectorStore>,
}

impl IndexingService {
    pub fn new(
        chunker: SemanticChunker,
        embeddings: Arc<EmbeddingService>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            chunker,
            embeddings,
            store,
        }
    }

    /// Chunk every document, dropping empty documents and repeated
    /// chunk ids (the first occurrence wins).
    pub fn prepare_chunks(&self, documents: &[Document]) -> (Vec<Chunk>, IndexReport) {
        let mut report = IndexReport {
            documents: documents.len(),
            ..IndexReport::default()
        };
        let mut seen = HashSet::new();
        let mut chunks = Vec::new();

        for document in documents {
            if document.is_empty() {
                report.skipped_documents += 1;
                continue;
            }
            for chunk in self.chunker.chunk_document(document) {
                if seen.insert(chunk.chunk_id.clone()) {
                    chunks.push(chunk);
                } else {
                    warn!(chunk_id = %chunk.chunk_id, "duplicate chunk id, keeping the first occurrence");
                    report.duplicate_chunks += 1;
                }
            }
        }

        report.chunks = chunks.len();
        (chunks, report)
    }

    /// Index `documents`, upserting each embedding batch as it completes,
    /// then flush so the new vectors become visible.
    ///
    /// Without `rebuild`, every reference being indexed replaces whatever
    /// the store held for it; other references are left alone.
    #[instrument(skip_all, fields(documents = documents.len(), rebuild = options.rebuild))]
    pub async fn index_documents(
        &self,
        documents: &[Document],
        options: IndexOptions,
        mut on_progress: impl FnMut(usize, usize) + Send,
    ) -> DomainResult<IndexReport> {
        let (chunks, mut report) = self.prepare_chunks(documents);

        if options.rebuild {
            self.store.clear().await?;
            info!(backend = self.store.backend(), "cleared store for rebuild");
        } else {
            // A reference is indexed as a whole, so its old chunks go first
            let mut references: Vec<String> = Vec::new();
            let mut seen = HashSet::new();
            for chunk in &chunks {
                if seen.insert(chunk.reference.to_lowercase()) {
                    references.push(chunk.reference.clone());
                }
            }
            report.replaced_chunks = self.store.remove_references(&references).await?;
            if report.replaced_chunks > 0 {
                info!(replaced = report.replaced_chunks, "removed previously stored chunks");
            }
        }

        let mut batches = std::pin::pin!(self.embeddings.embed_chunk_batches(&chunks));
        while let Some(batch) = batches.next().await {
            let batch = batch?;
            self.store.upsert_batch(&batch).await?;
            report.vectors_stored += batch.len();
            on_progress(report.vectors_stored, report.chunks);
        }

        self.store.flush().await?;
        report.store_count = self.store.count().await?;

        info!(
            chunks = report.chunks,
            stored = report.vectors_stored,
            skipped = report.skipped_documents,
            total = report.store_count,
            "indexing complete"
        );
        Ok(report)
    }
}
