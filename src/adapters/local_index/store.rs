use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use super::format::{cosine, decode_vectors, encode_vectors, norm};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Chunk, EmbeddedChunk, SearchResult};
use crate::domain::ports::VectorStore;

const METADATA_VERSION: u32 = 1;

#[derive(Debug)]
struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
    norm: f32,
}

/// An immutable view of the index. Queries run against one snapshot;
/// writers build the next one.
#[derive(Debug, Default, Clone)]
struct IndexSnapshot {
    entries: Vec<Arc<Entry>>,
    positions: HashMap<String, usize>,
}

impl IndexSnapshot {
    fn upsert(&mut self, entry: Entry) {
        let entry = Arc::new(entry);
        match self.positions.get(&entry.chunk.chunk_id) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.positions
                    .insert(entry.chunk.chunk_id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Removes entries of the given lower-cased references.
    fn remove_references(&mut self, wanted: &HashSet<String>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !wanted.contains(&entry.chunk.reference.to_lowercase()));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.positions = self
                .entries
                .iter()
                .enumerate()
                .map(|(pos, entry)| (entry.chunk.chunk_id.clone(), pos))
                .collect();
        }
        removed
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Serialize)]
struct MetadataFileRef<'a> {
    version: u32,
    dimension: usize,
    chunks: Vec<&'a Chunk>,
}

#[derive(Deserialize)]
struct MetadataFile {
    version: u32,
    dimension: usize,
    chunks: Vec<Chunk>,
}

/// Flat cosine index held in memory and persisted to a directory
///
/// Constructed with [`LocalIndex::open`] and torn down with
/// [`VectorStore::close`]. Writes accumulate in a staging snapshot;
/// [`VectorStore::flush`] persists it and swaps it in atomically, so
/// concurrent queries keep reading the previous snapshot until then.
#[derive(Debug)]
pub struct LocalIndex {
    dir: PathBuf,
    collection: String,
    dimension: usize,
    live: RwLock<Arc<IndexSnapshot>>,
    staging: Mutex<Option<IndexSnapshot>>,
}

impl LocalIndex {
    /// Load the index from `dir`, or start empty when no index exists yet.
    ///
    /// Exactly one of the two files being present, a count mismatch, or a
    /// dimension other than `dimension` is a data-integrity error.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display(), collection = collection))]
    pub async fn open(
        dir: impl AsRef<Path>,
        collection: &str,
        dimension: usize,
    ) -> DomainResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        let index = Self {
            dir,
            collection: collection.to_string(),
            dimension,
            live: RwLock::new(Arc::new(IndexSnapshot::default())),
            staging: Mutex::new(None),
        };

        let snapshot = index.load_snapshot().await?;
        info!(chunks = snapshot.len(), dimension, "opened local index");
        *index.live.write().await = Arc::new(snapshot);
        Ok(index)
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(format!("{}.index", self.collection))
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join(format!("{}.meta.json", self.collection))
    }

    async fn load_snapshot(&self) -> DomainResult<IndexSnapshot> {
        let index_path = self.index_path();
        let metadata_path = self.metadata_path();

        let index_bytes = read_optional(&index_path).await?;
        let metadata_bytes = read_optional(&metadata_path).await?;

        let (index_bytes, metadata_bytes) = match (index_bytes, metadata_bytes) {
            (None, None) => return Ok(IndexSnapshot::default()),
            (Some(i), Some(m)) => (i, m),
            (Some(_), None) => {
                return Err(DomainError::DataIntegrity(format!(
                    "{} exists without {}",
                    index_path.display(),
                    metadata_path.display()
                )))
            }
            (None, Some(_)) => {
                return Err(DomainError::DataIntegrity(format!(
                    "{} exists without {}",
                    metadata_path.display(),
                    index_path.display()
                )))
            }
        };

        let (file_dimension, vectors) = decode_vectors(&index_bytes)?;
        let metadata: MetadataFile = serde_json::from_slice(&metadata_bytes).map_err(|e| {
            DomainError::DataIntegrity(format!("unreadable {}: {e}", metadata_path.display()))
        })?;

        if metadata.version != METADATA_VERSION {
            return Err(DomainError::DataIntegrity(format!(
                "{} has unsupported version {}",
                metadata_path.display(),
                metadata.version
            )));
        }

        if vectors.len() != metadata.chunks.len() {
            return Err(DomainError::DataIntegrity(format!(
                "index holds {} vectors but metadata lists {} chunks",
                vectors.len(),
                metadata.chunks.len()
            )));
        }

        if !vectors.is_empty()
            && (file_dimension != self.dimension || metadata.dimension != self.dimension)
        {
            return Err(DomainError::DataIntegrity(format!(
                "index was built with dimension {file_dimension}, configured dimension is {}",
                self.dimension
            )));
        }

        let mut snapshot = IndexSnapshot::default();
        for (chunk, vector) in metadata.chunks.into_iter().zip(vectors) {
            if snapshot.positions.contains_key(&chunk.chunk_id) {
                return Err(DomainError::DataIntegrity(format!(
                    "duplicate chunk id {} in index metadata",
                    chunk.chunk_id
                )));
            }
            snapshot.upsert(Entry {
                norm: norm(&vector),
                chunk,
                vector,
            });
        }

        Ok(snapshot)
    }

    async fn persist(&self, snapshot: &IndexSnapshot) -> DomainResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let index_bytes = encode_vectors(
            self.dimension,
            snapshot.entries.iter().map(|e| e.vector.as_slice()),
        )?;
        let metadata = MetadataFileRef {
            version: METADATA_VERSION,
            dimension: self.dimension,
            chunks: snapshot.entries.iter().map(|e| &e.chunk).collect(),
        };
        let metadata_bytes = serde_json::to_vec(&metadata)?;

        write_atomic(&self.index_path(), &index_bytes).await?;
        write_atomic(&self.metadata_path(), &metadata_bytes).await?;
        Ok(())
    }

    fn check_dimension(&self, vector: &[f32], what: &str) -> DomainResult<()> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(DomainError::DataIntegrity(format!(
                "{what} has dimension {}, index dimension is {}",
                vector.len(),
                self.dimension
            )))
        }
    }

    async fn current(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&*self.live.read().await)
    }

    async fn stage<F>(&self, apply: F)
    where
        F: FnOnce(&mut IndexSnapshot),
    {
        let mut staging = self.staging.lock().await;
        if staging.is_none() {
            *staging = Some(self.current().await.as_ref().clone());
        }
        if let Some(snapshot) = staging.as_mut() {
            apply(snapshot);
        }
    }
}

async fn read_optional(path: &Path) -> DomainResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> DomainResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl VectorStore for LocalIndex {
    fn backend(&self) -> &'static str {
        "local"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, chunk: &Chunk, vector: &[f32]) -> DomainResult<()> {
        self.check_dimension(vector, &format!("vector for {}", chunk.chunk_id))?;
        let entry = Entry {
            chunk: chunk.clone(),
            vector: vector.to_vec(),
            norm: norm(vector),
        };
        self.stage(|snapshot| snapshot.upsert(entry)).await;
        Ok(())
    }

    async fn upsert_batch(&self, items: &[EmbeddedChunk]) -> DomainResult<()> {
        for item in items {
            self.check_dimension(&item.vector, &format!("vector for {}", item.chunk.chunk_id))?;
        }
        self.stage(|snapshot| {
            for item in items {
                snapshot.upsert(Entry {
                    chunk: item.chunk.clone(),
                    vector: item.vector.clone(),
                    norm: norm(&item.vector),
                });
            }
        })
        .await;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> DomainResult<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(vector, "query vector")?;

        let snapshot = self.current().await;
        let query_norm = norm(vector);
        if query_norm == 0.0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &Entry)> = snapshot
            .entries
            .iter()
            .filter_map(|entry| {
                let similarity = cosine(&entry.vector, entry.norm, vector, query_norm);
                (similarity >= threshold).then_some((similarity, entry.as_ref()))
            })
            .collect();

        // Stable: equal scores keep insertion order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        debug!(candidates = snapshot.len(), returned = scored.len(), threshold, "local query");

        Ok(scored
            .into_iter()
            .map(|(similarity, entry)| SearchResult::semantic(&entry.chunk, similarity))
            .collect())
    }

    async fn query_by_reference(&self, reference: &str) -> DomainResult<Vec<SearchResult>> {
        let wanted = reference.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.current().await;
        let mut matches: Vec<&Chunk> = snapshot
            .entries
            .iter()
            .map(|entry| &entry.chunk)
            .filter(|chunk| chunk.reference.to_lowercase() == wanted)
            .collect();
        matches.sort_by_key(|chunk| chunk.chunk_index);

        Ok(matches.into_iter().map(SearchResult::exact).collect())
    }

    async fn remove_references(&self, references: &[String]) -> DomainResult<usize> {
        let wanted: HashSet<String> = references.iter().map(|r| r.trim().to_lowercase()).collect();
        if wanted.is_empty() {
            return Ok(0);
        }
        let mut removed = 0;
        self.stage(|snapshot| removed = snapshot.remove_references(&wanted))
            .await;
        debug!(references = wanted.len(), removed, "staged reference removal");
        Ok(removed)
    }

    async fn count(&self) -> DomainResult<usize> {
        Ok(self.current().await.len())
    }

    async fn clear(&self) -> DomainResult<()> {
        *self.staging.lock().await = Some(IndexSnapshot::default());
        Ok(())
    }

    async fn flush(&self) -> DomainResult<()> {
        let mut staging = self.staging.lock().await;
        let Some(snapshot) = staging.take() else {
            return Ok(());
        };

        if let Err(e) = self.persist(&snapshot).await {
            // Keep the staged writes so a later flush can retry
            *staging = Some(snapshot);
            return Err(e);
        }

        let chunks = snapshot.len();
        *self.live.write().await = Arc::new(snapshot);
        info!(chunks, dir = %self.dir.display(), "flushed local index");
        Ok(())
    }

    async fn close(&self) -> DomainResult<()> {
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(reference: &str, index: usize, total: usize) -> Chunk {
        Chunk::new(reference, "Test", index, total, format!("{reference} part {index}"))
    }

    #[tokio::test]
    async fn test_open_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::open(dir.path(), "test", 3).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_writes_invisible_until_flush() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::open(dir.path(), "test", 2).await.unwrap();

        index.upsert(&chunk("A 1", 0, 1), &[1.0, 0.0]).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(index.query_by_reference("A 1").await.unwrap().is_empty());

        index.flush().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_chunk_id() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::open(dir.path(), "test", 2).await.unwrap();

        index.upsert(&chunk("A 1", 0, 1), &[1.0, 0.0]).await.unwrap();
        index.upsert(&chunk("A 1", 0, 1), &[0.0, 1.0]).await.unwrap();
        index.flush().await.unwrap();

        assert_eq!(index.count().await.unwrap(), 1);
        let hits = index.query(&[0.0, 1.0], 5, 0.9).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::open(dir.path(), "test", 3).await.unwrap();

        let err = index.upsert(&chunk("A 1", 0, 1), &[1.0]).await.unwrap_err();
        assert!(matches!(err, DomainError::DataIntegrity(_)));

        let err = index.query(&[1.0, 0.0], 3, 0.0).await.unwrap_err();
        assert!(matches!(err, DomainError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn test_query_orders_and_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::open(dir.path(), "test", 2).await.unwrap();
        index
            .upsert_batch(&[
                EmbeddedChunk::new(chunk("A 1", 0, 1), vec![1.0, 0.0]),
                EmbeddedChunk::new(chunk("A 2", 0, 1), vec![0.8, 0.6]),
                EmbeddedChunk::new(chunk("A 3", 0, 1), vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        index.flush().await.unwrap();

        let hits = index.query(&[1.0, 0.0], 10, 0.5).await.unwrap();
        let refs: Vec<_> = hits.iter().map(|h| h.reference.as_str()).collect();
        assert_eq!(refs, vec!["A 1", "A 2"]);
        assert!(hits[0].similarity >= hits[1].similarity);

        let top1 = index.query(&[1.0, 0.0], 1, 0.0).await.unwrap();
        assert_eq!(top1.len(), 1);
        assert_eq!(top1[0].reference, "A 1");
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::open(dir.path(), "test", 2).await.unwrap();
        for reference in ["B 1", "B 2", "B 3"] {
            index.upsert(&chunk(reference, 0, 1), &[1.0, 1.0]).await.unwrap();
        }
        index.flush().await.unwrap();

        let hits = index.query(&[1.0, 1.0], 3, 0.0).await.unwrap();
        let refs: Vec<_> = hits.iter().map(|h| h.reference.as_str()).collect();
        assert_eq!(refs, vec!["B 1", "B 2", "B 3"]);
    }

    #[tokio::test]
    async fn test_query_by_reference_is_case_insensitive_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::open(dir.path(), "test", 2).await.unwrap();
        index.upsert(&chunk("Likutei Moharan 1", 1, 2), &[1.0, 0.0]).await.unwrap();
        index.upsert(&chunk("Likutei Moharan 1", 0, 2), &[0.0, 1.0]).await.unwrap();
        index.upsert(&chunk("Likutei Moharan 10", 0, 1), &[1.0, 1.0]).await.unwrap();
        index.flush().await.unwrap();

        let hits = index.query_by_reference("likutei moharan 1").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_index, 0);
        assert_eq!(hits[1].chunk_index, 1);
        assert!(hits.iter().all(|h| h.is_exact() && (h.similarity - 1.0).abs() < f32::EPSILON));
    }

    #[tokio::test]
    async fn test_reopen_restores_index() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = LocalIndex::open(dir.path(), "test", 2).await.unwrap();
            index.upsert(&chunk("A 1", 0, 1), &[1.0, 0.0]).await.unwrap();
            index.upsert(&chunk("A 2", 0, 1), &[0.0, 1.0]).await.unwrap();
            index.close().await.unwrap();
        }

        let index = LocalIndex::open(dir.path(), "test", 2).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
        let hits = index.query(&[0.0, 1.0], 1, 0.5).await.unwrap();
        assert_eq!(hits[0].reference, "A 2");
    }

    #[tokio::test]
    async fn test_remove_references_drops_stale_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::open(dir.path(), "test", 2).await.unwrap();
        index
            .upsert_batch(&[
                EmbeddedChunk::new(chunk("A 1", 0, 3), vec![1.0, 0.0]),
                EmbeddedChunk::new(chunk("B 1", 0, 1), vec![0.0, 1.0]),
                EmbeddedChunk::new(chunk("A 1", 1, 3), vec![1.0, 0.0]),
                EmbeddedChunk::new(chunk("A 1", 2, 3), vec![1.0, 0.0]),
            ])
            .await
            .unwrap();
        index.flush().await.unwrap();

        let removed = index.remove_references(&["a 1".to_string()]).await.unwrap();
        assert_eq!(removed, 3);
        index.upsert(&chunk("A 1", 0, 1), &[1.0, 0.0]).await.unwrap();
        index.flush().await.unwrap();

        assert_eq!(index.count().await.unwrap(), 2);
        let found = index.query_by_reference("A 1").await.unwrap();
        let positions: Vec<_> = found.iter().map(|r| (r.chunk_index, r.total_chunks)).collect();
        assert_eq!(positions, vec![(0, 1)]);
        assert_eq!(index.query_by_reference("B 1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_empties_on_flush() {
        let dir = tempfile::tempdir().unwrap();
        let index = LocalIndex::open(dir.path(), "test", 2).await.unwrap();
        index.upsert(&chunk("A 1", 0, 1), &[1.0, 0.0]).await.unwrap();
        index.flush().await.unwrap();

        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1, "previous snapshot still served");
        index.flush().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
