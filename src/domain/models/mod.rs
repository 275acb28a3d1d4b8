pub mod chunking;
pub mod config;
pub mod document;
pub mod search;

pub use chunking::{Chunk, ChunkingConfig, EmbeddedChunk};
pub use config::{
    Config, EmbeddingConfig, EmbeddingProviderKind, FetcherConfig, GenerationConfig,
    LocalIndexConfig, LoggingConfig, PostgresConfig, RateLimitConfig, RetrievalConfig,
    RetryConfig, StoreBackend, StoreConfig,
};
pub use document::{CorpusSnapshot, Document};
pub use search::{Answer, AnswerLanguage, Grounding, MatchType, SearchResult};
