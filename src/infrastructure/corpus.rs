//! On-disk corpus snapshot written by `fetch` and read by `index`.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::CorpusSnapshot;

/// JSON corpus file at a fixed path
#[derive(Debug, Clone)]
pub struct CorpusFile {
    path: PathBuf,
}

impl CorpusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the snapshot. A missing file is a configuration error: the
    /// corpus has to be fetched before it can be indexed.
    pub async fn load(&self) -> DomainResult<CorpusSnapshot> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DomainError::Configuration(format!(
                    "corpus file {} not found; run `guezi fetch` first",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: CorpusSnapshot = serde_json::from_slice(&bytes).map_err(|e| {
            DomainError::DataIntegrity(format!(
                "corpus file {} is not a valid snapshot: {e}",
                self.path.display()
            ))
        })?;

        info!(
            path = %self.path.display(),
            documents = snapshot.documents.len(),
            fetched_at = %snapshot.fetched_at,
            "loaded corpus"
        );
        Ok(snapshot)
    }

    /// Write the snapshot via a temporary file and rename.
    pub async fn save(&self, snapshot: &CorpusSnapshot) -> DomainResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        info!(
            path = %self.path.display(),
            documents = snapshot.documents.len(),
            "saved corpus"
        );
        Ok(())
    }
}
