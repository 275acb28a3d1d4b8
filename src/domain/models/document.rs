//! Source documents as fetched from the text API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named bilingual source text.
///
/// Immutable once fetched. `reference` is the canonical citation
/// (e.g. "Likutei Moharan 1") and is the key used by exact-reference
/// search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub reference: String,
    /// Original-language (Hebrew) text
    #[serde(default)]
    pub original_text: String,
    /// Translated (English) text
    #[serde(default)]
    pub translated_text: String,
}

impl Document {
    pub fn new(
        title: impl Into<String>,
        reference: impl Into<String>,
        original_text: impl Into<String>,
        translated_text: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            reference: reference.into(),
            original_text: original_text.into(),
            translated_text: translated_text.into(),
        }
    }

    /// True when neither language carries any non-whitespace text.
    pub fn is_empty(&self) -> bool {
        self.original_text.trim().is_empty() && self.translated_text.trim().is_empty()
    }

    /// Translation followed by the original, separated by a blank line.
    ///
    /// This is the body the chunker splits; the blank line keeps the
    /// language switch on a paragraph boundary.
    pub fn body(&self) -> String {
        [self.translated_text.trim(), self.original_text.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Citation header prepended to embedded text.
    pub fn header(&self) -> String {
        format!("[{} - {}]", self.title, self.reference)
    }
}

/// A fetched corpus persisted to disk between `fetch` and `index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub source: String,
    pub documents: Vec<Document>,
}

impl CorpusSnapshot {
    pub fn new(source: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            fetched_at: Utc::now(),
            source: source.into(),
            documents,
        }
    }
}
