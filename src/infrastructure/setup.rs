//! Guezi setup and service wiring
//!
//! Handles project initialization (the `.guezi` directory and default
//! config file) and builds the service graph from a loaded [`Config`].
//! Every service is constructed here explicitly; nothing is global.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::embeddings::provider_from_config;
use crate::adapters::generation::GeminiGenerator;
use crate::adapters::local_index::LocalIndex;
use crate::adapters::postgres::PgVectorStore;
use crate::adapters::sefaria::SefariaClient;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Config, StoreBackend};
use crate::domain::ports::{AnswerGenerator, EmbeddingProvider, VectorStore};
use crate::infrastructure::corpus::CorpusFile;
use crate::infrastructure::http::{RateLimiter, RetryPolicy};
use crate::services::{
    AnswerService, EmbeddingService, EmbeddingServiceConfig, IndexingService, RetrievalService,
    SemanticChunker,
};

/// Default configuration template content
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Guezi Configuration
# Override settings by editing this file, adding .guezi/local.yaml, or
# setting environment variables with the GUEZI_ prefix
#
# Example environment variables:
#   export GUEZI_STORE__BACKEND=postgres
#   export GUEZI_RETRIEVAL__SEMANTIC_THRESHOLD=0.5
#   export GUEZI_LOGGING__LEVEL=debug
#
# API keys fall back to GEMINI_API_KEY / OPENAI_API_KEY and the Postgres
# URL to DATABASE_URL; keep secrets out of this file.

fetcher:
  base_url: "https://www.sefaria.org/api"
  corpus_path: ".guezi/corpus.json"

chunking:
  target_chunk_size: 1000
  min_chunk_size: 200
  max_chunk_size: 1500
  overlap_size: 150

embedding:
  # gemini or openai
  provider: "gemini"
  model: "gemini-embedding-001"
  dimension: 3072
  batch_size: 20
  concurrency: 4

store:
  # local or postgres
  backend: "local"
  local:
    dir: ".guezi/index"
    collection: "breslov"

retrieval:
  semantic_threshold: 0.4
  max_results: 7

generation:
  model: "gemini-2.0-flash"
  temperature: 0.7

logging:
  # Log level: trace, debug, info, warn, error
  level: "info"
  # Log format: json, pretty
  format: "pretty"

rate_limit:
  requests_per_second: 2.0
  burst_size: 4

retry:
  max_retries: 3
  initial_backoff_ms: 500
  max_backoff_ms: 10000
"#;

/// Setup paths and directories
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl SetupPaths {
    /// Get setup paths for the current directory
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::in_dir(current_dir))
    }

    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        let config_dir = root.into().join(".guezi");
        Self {
            config_file: config_dir.join("config.yaml"),
            config_dir,
        }
    }

    /// Check if Guezi is already initialized
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }
}

/// Create the configuration directory and default config file.
/// Returns false when an existing config was left in place.
pub fn initialize(paths: &SetupPaths, force: bool) -> Result<bool> {
    if paths.is_initialized() && !force {
        return Ok(false);
    }

    fs::create_dir_all(&paths.config_dir).context("Failed to create config directory")?;
    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE).context("Failed to write config file")?;
    Ok(true)
}

/// Open the configured vector store backend.
pub async fn open_store(config: &Config) -> DomainResult<Arc<dyn VectorStore>> {
    let dimension = config.embedding.dimension;
    Ok(match config.store.backend {
        StoreBackend::Local => {
            let local = &config.store.local;
            Arc::new(LocalIndex::open(&local.dir, &local.collection, dimension).await?)
        }
        StoreBackend::Postgres => {
            Arc::new(PgVectorStore::connect(&config.store.postgres, dimension).await?)
        }
    })
}

/// Sefaria client sharing the configured rate limit and retry policy.
pub fn text_source(config: &Config) -> DomainResult<SefariaClient> {
    let limiter = Arc::new(RateLimiter::new(&config.rate_limit)?);
    SefariaClient::new(&config.fetcher, limiter, RetryPolicy::from_config(&config.retry))
}

/// Services for indexing and querying, built over one store
pub struct AppContext {
    config: Config,
    store: Arc<dyn VectorStore>,
    embeddings: Arc<EmbeddingService>,
    retrieval: Arc<RetrievalService>,
}

impl AppContext {
    /// Build the service graph from configuration.
    pub async fn from_config(config: Config) -> DomainResult<Self> {
        let provider = provider_from_config(&config.embedding)?;
        let store = open_store(&config).await?;
        Self::with_components(config, store, provider)
    }

    /// Build the service graph over externally constructed adapters.
    pub fn with_components(
        config: Config,
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> DomainResult<Self> {
        if provider.dimension() != store.dimension() {
            return Err(DomainError::Configuration(format!(
                "embedding dimension {} does not match store dimension {}",
                provider.dimension(),
                store.dimension()
            )));
        }

        let limiter = Arc::new(RateLimiter::new(&config.rate_limit)?);
        let embeddings = Arc::new(
            EmbeddingService::new(
                provider,
                EmbeddingServiceConfig::from(&config.embedding),
                RetryPolicy::from_config(&config.retry),
            )
            .with_rate_limiter(limiter),
        );
        let retrieval = Arc::new(RetrievalService::new(Arc::clone(&store), &config.retrieval));

        info!(
            provider = embeddings.provider_name(),
            backend = store.backend(),
            dimension = store.dimension(),
            "services ready"
        );

        Ok(Self {
            config,
            store,
            embeddings,
            retrieval,
        })
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn embeddings(&self) -> &Arc<EmbeddingService> {
        &self.embeddings
    }

    pub fn retrieval(&self) -> &Arc<RetrievalService> {
        &self.retrieval
    }

    pub fn corpus_file(&self) -> CorpusFile {
        CorpusFile::new(&self.config.fetcher.corpus_path)
    }

    pub fn indexing_service(&self) -> DomainResult<IndexingService> {
        let chunker = SemanticChunker::with_config(self.config.chunking.clone())?;
        Ok(IndexingService::new(
            chunker,
            Arc::clone(&self.embeddings),
            Arc::clone(&self.store),
        ))
    }

    /// Answer service over the given generator.
    pub fn answer_service(&self, generator: Arc<dyn AnswerGenerator>) -> AnswerService {
        AnswerService::new(
            Arc::clone(&self.embeddings),
            Arc::clone(&self.retrieval),
            generator,
        )
    }

    /// The configured Gemini generator.
    pub fn generator(&self) -> DomainResult<Arc<dyn AnswerGenerator>> {
        Ok(Arc::new(GeminiGenerator::new(&self.config.generation)?))
    }

    /// Flush pending writes and release the store.
    pub async fn shutdown(&self) -> DomainResult<()> {
        if let Err(e) = self.store.close().await {
            warn!(error = %e, "store did not close cleanly");
            return Err(e);
        }
        Ok(())
    }
}
