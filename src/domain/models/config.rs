use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::chunking::ChunkingConfig;

/// Main configuration structure for guezi
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Text API and corpus file settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Chunk sizing
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector store backend selection
    #[serde(default)]
    pub store: StoreConfig,

    /// Hybrid search tuning
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Answer generator configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Client-side rate limiting for outbound API calls
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Sefaria fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FetcherConfig {
    #[serde(default = "default_sefaria_url")]
    pub base_url: String,

    /// Book references fetched by `guezi fetch`
    #[serde(default = "default_books")]
    pub books: Vec<String>,

    /// Where the fetched corpus snapshot is written
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,

    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_sefaria_url() -> String {
    "https://www.sefaria.org/api".to_string()
}

fn default_books() -> Vec<String> {
    [
        "Likutei Moharan",
        "Likutei Moharan, Part II",
        "Sippurei Maasiyot",
        "Likutei Tefilot",
        "Sefer HaMiddot",
        "Sichot HaRan",
        "Shivchei HaRan",
        "Chayei Moharan",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from(".guezi/corpus.json")
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: default_sefaria_url(),
            books: default_books(),
            corpus_path: default_corpus_path(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Which embedding API to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    Gemini,
    OpenAi,
}

impl EmbeddingProviderKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimension; must match the model and the store schema
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// API key; falls back to GEMINI_API_KEY / OPENAI_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the provider's endpoint (proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Embedding requests in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    "gemini-embedding-001".to_string()
}

const fn default_dimension() -> usize {
    3072
}

const fn default_batch_size() -> usize {
    20
}

const fn default_concurrency() -> usize {
    4
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            api_key: None,
            base_url: None,
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Vector store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Local,
    Postgres,
}

/// Vector store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default)]
    pub local: LocalIndexConfig,

    #[serde(default)]
    pub postgres: PostgresConfig,
}

/// Local flat index location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LocalIndexConfig {
    #[serde(default = "default_index_dir")]
    pub dir: PathBuf,

    /// File stem for the index and metadata files
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_index_dir() -> PathBuf {
    PathBuf::from(".guezi/index")
}

fn default_collection() -> String {
    "breslov".to_string()
}

impl Default for LocalIndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
            collection: default_collection(),
        }
    }
}

/// Managed Postgres + pgvector backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PostgresConfig {
    /// Connection URL; falls back to DATABASE_URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// IVFFlat list count
    #[serde(default = "default_ivfflat_lists")]
    pub ivfflat_lists: u32,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_ivfflat_lists() -> u32 {
    100
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            ivfflat_lists: default_ivfflat_lists(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Hybrid search tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Minimum cosine similarity for semantic results
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f32,

    /// Overall cap on returned results
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

const fn default_semantic_threshold() -> f32 {
    0.4
}

const fn default_max_results() -> usize {
    7
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: default_semantic_threshold(),
            max_results: default_max_results(),
        }
    }
}

/// Answer generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// API key; falls back to GEMINI_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Per-source character cap in the prompt
    #[serde(default = "default_max_source_chars")]
    pub max_source_chars: usize,

    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generation_model() -> String {
    "gemini-2.0-flash".to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_output_tokens() -> u32 {
    2048
}

const fn default_max_source_chars() -> usize {
    1500
}

const fn default_generation_timeout_secs() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            max_source_chars: default_max_source_chars(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            retention_days: default_retention_days(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Burst size for token bucket
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

const fn default_requests_per_second() -> f64 {
    2.0
}

const fn default_burst_size() -> u32 {
    4
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}
