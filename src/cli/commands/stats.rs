//! Implementation of the `guezi stats` command.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::corpus::CorpusFile;
use crate::infrastructure::setup::open_store;

#[derive(Args, Debug)]
pub struct StatsArgs {}

#[derive(Debug, serde::Serialize)]
pub struct CorpusStats {
    pub path: PathBuf,
    pub source: String,
    pub documents: usize,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize)]
pub struct StatsOutput {
    pub backend: &'static str,
    pub dimension: usize,
    pub chunks: usize,
    pub embedding_model: String,
    pub corpus: Option<CorpusStats>,
}

impl CommandOutput for StatsOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Store:      {} ({} dimensions)", self.backend, self.dimension),
            format!("Chunks:     {}", self.chunks),
            format!("Embeddings: {}", self.embedding_model),
        ];
        match &self.corpus {
            Some(corpus) => {
                lines.push(format!(
                    "Corpus:     {} document(s) from {} in {}",
                    corpus.documents,
                    corpus.source,
                    corpus.path.display()
                ));
                lines.push(format!("Fetched:    {}", corpus.fetched_at.format("%Y-%m-%d %H:%M UTC")));
            }
            None => lines.push("Corpus:     not fetched (run `guezi fetch`)".to_string()),
        }
        lines.join("\n")
    }
}

pub async fn execute(_args: StatsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = open_store(config).await.context("Failed to open vector store")?;
    let chunks = store.count().await.context("Failed to count stored chunks")?;
    store.close().await.context("Failed to close vector store")?;

    let corpus_file = CorpusFile::new(&config.fetcher.corpus_path);
    let corpus = if corpus_file.exists() {
        let snapshot = corpus_file.load().await.context("Failed to read corpus")?;
        Some(CorpusStats {
            path: corpus_file.path().to_path_buf(),
            source: snapshot.source,
            documents: snapshot.documents.len(),
            fetched_at: snapshot.fetched_at,
        })
    } else {
        None
    };

    output(
        &StatsOutput {
            backend: store.backend(),
            dimension: store.dimension(),
            chunks,
            embedding_model: format!(
                "{} {}",
                config.embedding.provider.as_str(),
                config.embedding.model
            ),
            corpus,
        },
        json_mode,
    );
    Ok(())
}
