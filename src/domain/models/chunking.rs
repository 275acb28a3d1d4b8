//! Text chunking domain models
//!
//! Models for splitting documents into retrievable chunks. Sizes are
//! measured in characters, not bytes, so Hebrew and English text are
//! bounded the same way.

use serde::{Deserialize, Serialize};

/// Configuration for document chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Preferred chunk length; segments are packed until adding the next
    /// one would pass this size
    #[serde(default = "default_target_chunk_size")]
    pub target_chunk_size: usize,

    /// A trailing chunk shorter than this is merged into its predecessor
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,

    /// Hard upper bound on chunk length
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Upper bound on text carried over from the previous chunk
    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,
}

const fn default_target_chunk_size() -> usize {
    1000
}

const fn default_min_chunk_size() -> usize {
    200
}

const fn default_max_chunk_size() -> usize {
    1500
}

const fn default_overlap_size() -> usize {
    150
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chunk_size: default_target_chunk_size(),
            min_chunk_size: default_min_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
            overlap_size: default_overlap_size(),
        }
    }
}

impl ChunkingConfig {
    /// Create configuration for small chunks (better for precise retrieval)
    pub const fn small() -> Self {
        Self {
            target_chunk_size: 500,
            min_chunk_size: 100,
            max_chunk_size: 800,
            overlap_size: 80,
        }
    }

    /// Validate the chunking configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_size == 0 {
            return Err("max_chunk_size must be greater than 0".to_string());
        }

        if self.target_chunk_size == 0 || self.target_chunk_size > self.max_chunk_size {
            return Err(format!(
                "target_chunk_size ({}) must be between 1 and max_chunk_size ({})",
                self.target_chunk_size, self.max_chunk_size
            ));
        }

        if self.min_chunk_size > self.target_chunk_size {
            return Err(format!(
                "min_chunk_size ({}) must not exceed target_chunk_size ({})",
                self.min_chunk_size, self.target_chunk_size
            ));
        }

        if self.overlap_size >= self.max_chunk_size {
            return Err("overlap_size must be less than max_chunk_size".to_string());
        }

        Ok(())
    }
}

/// A segment of a source document sized for embedding
///
/// Chunks are immutable once produced. A re-index replaces them wholesale,
/// keyed by `chunk_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier, `{reference}_chunk_{chunk_index}`
    pub chunk_id: String,

    /// Canonical reference of the parent document
    pub reference: String,

    pub title: String,

    /// Position within the parent document (0-based)
    pub chunk_index: usize,

    /// Number of chunks the parent document was split into
    pub total_chunks: usize,

    /// Original-language text; only set when the document was not split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,

    /// Translated text; only set when the document was not split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,

    /// Combined display text of this segment
    pub text: String,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        reference: impl Into<String>,
        title: impl Into<String>,
        chunk_index: usize,
        total_chunks: usize,
        text: impl Into<String>,
    ) -> Self {
        let reference = reference.into();
        Self {
            chunk_id: Self::id_for(&reference, chunk_index),
            reference,
            title: title.into(),
            chunk_index,
            total_chunks,
            original_text: None,
            translated_text: None,
            text: text.into(),
        }
    }

    /// Chunk id for a reference and position.
    pub fn id_for(reference: &str, chunk_index: usize) -> String {
        format!("{reference}_chunk_{chunk_index}")
    }

    /// Attach the per-language texts of an unsplit document
    #[must_use]
    pub fn with_languages(
        mut self,
        original_text: impl Into<String>,
        translated_text: impl Into<String>,
    ) -> Self {
        self.original_text = Some(original_text.into());
        self.translated_text = Some(translated_text.into());
        self
    }

    /// Text sent to the embedding model: citation header plus segment.
    pub fn embedding_text(&self) -> String {
        format!("[{} - {}]\n\n{}", self.title, self.reference, self.text)
    }
}

/// A chunk paired with its embedding vector, ready for the vector store
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    pub const fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self { chunk, vector }
    }
}
