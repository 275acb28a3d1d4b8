use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{Config, EmbeddingProviderKind};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid chunking configuration: {0}")]
    InvalidChunking(String),

    #[error("Invalid embedding dimension: {0}. Must be between 1 and 16000")]
    InvalidDimension(usize),

    #[error("Invalid embedding batch_size: {0}. Must be at least 1")]
    InvalidBatchSize(usize),

    #[error("Invalid embedding concurrency: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    #[error("Invalid semantic_threshold: {0}. Must be within [0.0, 1.0]")]
    InvalidThreshold(f32),

    #[error("Invalid max_results: {0}. Must be at least 1")]
    InvalidMaxResults(usize),

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .guezi/config.yaml (project config)
    /// 3. .guezi/local.yaml (local overrides, optional)
    /// 4. Environment variables (GUEZI_* prefix, `__` for nesting)
    ///
    /// Credentials left unset fall back to the conventional provider
    /// variables (GEMINI_API_KEY, OPENAI_API_KEY, DATABASE_URL).
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(&[
            Path::new(".guezi/config.yaml"),
            Path::new(".guezi/local.yaml"),
        ])
        .extract()
        .context("Failed to extract configuration from figment")?;

        let config = Self::apply_credential_fallbacks(config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file (still honoring GUEZI_* overrides)
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Self::figment(&[path])
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        let config = Self::apply_credential_fallbacks(config);
        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(files: &[&Path]) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        for file in files {
            figment = figment.merge(Yaml::file(file));
        }
        figment.merge(Env::prefixed("GUEZI_").split("__"))
    }

    fn apply_credential_fallbacks(mut config: Config) -> Config {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if config.embedding.api_key.is_none() {
            config.embedding.api_key = match config.embedding.provider {
                EmbeddingProviderKind::Gemini => env("GEMINI_API_KEY"),
                EmbeddingProviderKind::OpenAi => env("OPENAI_API_KEY"),
            };
        }
        if config.generation.api_key.is_none() {
            config.generation.api_key = env("GEMINI_API_KEY");
        }
        if config.store.postgres.url.is_none() {
            config.store.postgres.url = env("DATABASE_URL");
        }
        config
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        // Validate rate_limit
        if config.rate_limit.requests_per_second <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(
                config.rate_limit.requests_per_second,
            ));
        }

        if config.rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.rate_limit.burst_size));
        }

        // Validate retry config
        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        config
            .chunking
            .validate()
            .map_err(ConfigError::InvalidChunking)?;

        // Validate embedding config
        if config.embedding.dimension == 0 || config.embedding.dimension > 16_000 {
            return Err(ConfigError::InvalidDimension(config.embedding.dimension));
        }

        if config.embedding.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(config.embedding.batch_size));
        }

        if config.embedding.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(config.embedding.concurrency));
        }

        if config.embedding.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "embedding.model cannot be empty".to_string(),
            ));
        }

        // Validate retrieval config
        let threshold = config.retrieval.semantic_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        if config.retrieval.max_results == 0 {
            return Err(ConfigError::InvalidMaxResults(config.retrieval.max_results));
        }

        // Validate store config
        if config.store.local.collection.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "store.local.collection cannot be empty".to_string(),
            ));
        }

        if config.store.postgres.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.store.postgres.max_connections,
            ));
        }

        if config.fetcher.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "fetcher.base_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::StoreBackend;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.embedding.dimension, 3072);
        assert_eq!(config.embedding.model, "gemini-embedding-001");
        assert!((config.retrieval.semantic_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.max_results, 7);
        assert_eq!(config.store.backend, StoreBackend::Local);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
embedding:
  provider: openai
  model: text-embedding-3-small
  dimension: 1536
  batch_size: 64
store:
  backend: postgres
  postgres:
    url: postgres://localhost/guezi
    max_connections: 3
retrieval:
  semantic_threshold: 0.5
  max_results: 5
chunking:
  max_chunk_size: 1200
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.embedding.provider, EmbeddingProviderKind::OpenAi);
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.embedding.batch_size, 64);
        assert_eq!(config.embedding.concurrency, 4, "unset fields keep defaults");
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(
            config.store.postgres.url.as_deref(),
            Some("postgres://localhost/guezi")
        );
        assert!((config.retrieval.semantic_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.chunking.max_chunk_size, 1200);
        assert_eq!(config.chunking.target_chunk_size, 1000);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_validate_zero_rate_limit() {
        let mut config = Config::default();
        config.rate_limit.requests_per_second = 0.0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRateLimit(_))
        ));
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 30000;
        config.retry.max_backoff_ms = 10000;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(30000, 10000))
        ));
    }

    #[test]
    fn test_validate_threshold_out_of_range() {
        let mut config = Config::default();
        config.retrieval.semantic_threshold = 1.5;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_validate_bad_chunking() {
        let mut config = Config::default();
        config.chunking.overlap_size = config.chunking.max_chunk_size;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidChunking(_))
        ));
    }

    #[test]
    fn test_validate_zero_dimension() {
        let mut config = Config::default();
        config.embedding.dimension = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidDimension(0))
        ));
    }

    #[test]
    fn test_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "retrieval:\n  max_results: 3\n  semantic_threshold: 0.45").unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("GUEZI_RETRIEVAL__MAX_RESULTS", Some("9")),
                ("GUEZI_LOGGING__LEVEL", Some("debug")),
                ("GUEZI_EMBEDDING__API_KEY", None),
                ("GEMINI_API_KEY", Some("from-env")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.retrieval.max_results, 9, "env should win over file");
                assert!((config.retrieval.semantic_threshold - 0.45).abs() < f32::EPSILON);
                assert_eq!(config.logging.level, "debug");
                assert_eq!(config.embedding.api_key.as_deref(), Some("from-env"));
                assert_eq!(config.generation.api_key.as_deref(), Some("from-env"));
            },
        );
    }

    #[test]
    fn test_explicit_key_beats_fallback() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "embedding:\n  api_key: from-file").unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("GEMINI_API_KEY", Some("from-env")),
                ("GUEZI_EMBEDDING__API_KEY", None),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.embedding.api_key.as_deref(), Some("from-file"));
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "retrieval:\n  max_results: 5\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "retrieval:\n  max_results: 8\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.retrieval.max_results, 8, "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}
