//! Retrieval results and grounded answers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::chunking::Chunk;

/// How a search result was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Stored reference equals the requested reference (case-insensitive)
    ExactReference,
    /// Nearest neighbour above the similarity threshold
    Semantic,
}

impl MatchType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExactReference => "exact_reference",
            Self::Semantic => "semantic",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact_reference" => Ok(Self::ExactReference),
            "semantic" => Ok(Self::Semantic),
            other => Err(format!("unknown match type: {other}")),
        }
    }
}

/// Search result with similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub reference: String,
    pub title: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub text: String,
    /// Cosine similarity clamped to [0.0, 1.0]; 1.0 for exact matches
    pub similarity: f32,
    pub match_type: MatchType,
}

impl SearchResult {
    /// Result for a chunk found by exact reference lookup.
    pub fn exact(chunk: &Chunk) -> Self {
        Self::from_chunk(chunk, 1.0, MatchType::ExactReference)
    }

    /// Result for a chunk found by nearest-neighbour search.
    pub fn semantic(chunk: &Chunk, similarity: f32) -> Self {
        Self::from_chunk(chunk, clamp_similarity(similarity), MatchType::Semantic)
    }

    fn from_chunk(chunk: &Chunk, similarity: f32, match_type: MatchType) -> Self {
        Self {
            chunk_id: chunk.chunk_id.clone(),
            reference: chunk.reference.clone(),
            title: chunk.title.clone(),
            chunk_index: chunk.chunk_index,
            total_chunks: chunk.total_chunks,
            text: chunk.text.clone(),
            similarity,
            match_type,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.match_type == MatchType::ExactReference
    }
}

/// Clamp a cosine similarity into the [0, 1] score range.
///
/// NaN (from a zero vector) scores as 0.
pub fn clamp_similarity(similarity: f32) -> f32 {
    if similarity.is_nan() {
        0.0
    } else {
        similarity.clamp(0.0, 1.0)
    }
}

/// Whether retrieval contributed context to an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Grounding {
    /// Retrieval succeeded and found passages
    Grounded,
    /// Retrieval succeeded but nothing matched
    NoMatches,
    /// Retrieval failed; the answer was generated without sources
    Unavailable(String),
}

/// Language the generator is asked to answer in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerLanguage {
    En,
    Fr,
    He,
}

impl AnswerLanguage {
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
            Self::He => "he",
        }
    }

    /// Prompt line asking for a reply in this language
    pub const fn instruction(self) -> &'static str {
        match self {
            Self::En => "Respond in English.",
            Self::Fr => "Respond in French (Français).",
            Self::He => "Respond in Hebrew (עברית). Use Hebrew script.",
        }
    }
}

impl fmt::Display for AnswerLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for AnswerLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "fr" | "french" => Ok(Self::Fr),
            "he" | "hebrew" => Ok(Self::He),
            other => Err(format!("unsupported answer language: {other} (expected en, fr or he)")),
        }
    }
}

/// A generated answer with the passages it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub text: String,
    pub sources: Vec<SearchResult>,
    pub grounding: Grounding,
}
