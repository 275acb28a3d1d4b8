//! Semantic text chunking
//!
//! Splits a document body at paragraph boundaries first, then at sentence
//! boundaries, and only hard-splits text that has neither. Segments are
//! packed greedily up to the target size, with a bounded tail of the
//! previous chunk carried into the next one for context.

use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Chunk, ChunkingConfig, Document};

/// Sentence terminators, including the Hebrew sof pasuq.
const SENTENCE_END: [char; 5] = ['.', '!', '?', ':', '\u{05C3}'];

const PARAGRAPH_SEP: &str = "\n\n";

/// Boundary-aware document chunker
#[derive(Debug, Clone, Default)]
pub struct SemanticChunker {
    config: ChunkingConfig,
}

/// A unit that is never split further, plus how it joins its predecessor.
#[derive(Debug, Clone)]
struct Segment {
    text: String,
    len: usize,
    sep: &'static str,
}

impl Segment {
    fn new(text: &str, sep: &'static str) -> Self {
        Self {
            text: text.to_string(),
            len: char_len(text),
            sep,
        }
    }
}

impl SemanticChunker {
    /// Create a new chunker with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new chunker with custom configuration
    pub fn with_config(config: ChunkingConfig) -> DomainResult<Self> {
        config
            .validate()
            .map_err(|e| DomainError::ValidationFailed(format!("invalid chunking config: {e}")))?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunk a single document.
    ///
    /// A document that fits in one chunk keeps its per-language texts.
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let body = document.body();
        let pieces = self.split_text(&body);
        let total = pieces.len();

        if total == 1 {
            let chunk = Chunk::new(&document.reference, &document.title, 0, 1, body)
                .with_languages(document.original_text.trim(), document.translated_text.trim());
            return vec![chunk];
        }

        debug!(reference = %document.reference, chunks = total, "split document");

        pieces
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                Chunk::new(&document.reference, &document.title, index, total, text)
            })
            .collect()
    }

    /// Chunk every document, in corpus order.
    pub fn chunk_corpus(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|document| self.chunk_document(document))
            .collect()
    }

    /// Split text into chunk bodies of at most `max_chunk_size` characters.
    ///
    /// Empty or whitespace-only text yields nothing.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        if char_len(text) <= self.config.max_chunk_size {
            return vec![text.to_string()];
        }

        self.pack(self.segments(text))
    }

    fn segments(&self, text: &str) -> Vec<Segment> {
        let max = self.config.max_chunk_size;
        let mut segments = Vec::new();

        for paragraph in split_paragraphs(text) {
            if char_len(&paragraph) <= max {
                segments.push(Segment::new(&paragraph, PARAGRAPH_SEP));
                continue;
            }

            let mut first = true;
            for sentence in split_sentences(&paragraph) {
                if char_len(sentence) <= max {
                    let sep = if first { PARAGRAPH_SEP } else { " " };
                    segments.push(Segment::new(sentence, sep));
                    first = false;
                    continue;
                }

                for (piece, sep) in hard_split(sentence, max) {
                    let sep = if first { PARAGRAPH_SEP } else { sep };
                    segments.push(Segment::new(&piece, sep));
                    first = false;
                }
            }
        }

        segments
    }

    fn pack(&self, segments: Vec<Segment>) -> Vec<String> {
        // Each packed chunk remembers how many leading segments were carried over.
        let mut packed: Vec<(Vec<Segment>, usize)> = Vec::new();
        let mut current: Vec<Segment> = Vec::new();
        let mut carried = 0;

        for segment in segments {
            if !current.is_empty()
                && joined_len(&current) + segment.sep.len() + segment.len
                    > self.config.target_chunk_size
            {
                let overlap = self.overlap_len(&current, &segment);
                let next = current[current.len() - overlap..].to_vec();
                packed.push((std::mem::replace(&mut current, next), carried));
                carried = overlap;
            }
            current.push(segment);
        }

        if !current.is_empty() {
            packed.push((current, carried));
        }

        self.merge_small_tail(&mut packed);

        packed
            .iter()
            .map(|(segments, _)| render(segments))
            .collect()
    }

    /// Number of trailing segments of `current` to repeat before `next`.
    fn overlap_len(&self, current: &[Segment], next: &Segment) -> usize {
        let mut count = 0;
        for n in 1..current.len() {
            let tail_len = joined_len(&current[current.len() - n..]);
            if tail_len > self.config.overlap_size
                || tail_len + next.sep.len() + next.len > self.config.max_chunk_size
            {
                break;
            }
            count = n;
        }
        count
    }

    fn merge_small_tail(&self, packed: &mut Vec<(Vec<Segment>, usize)>) {
        let n = packed.len();
        if n < 2 {
            return;
        }

        let (last, carried) = &packed[n - 1];
        if joined_len(last) >= self.config.min_chunk_size {
            return;
        }

        let mut merged = packed[n - 2].0.clone();
        merged.extend(last[*carried..].iter().cloned());

        if joined_len(&merged) <= self.config.max_chunk_size {
            packed.truncate(n - 1);
            packed[n - 2].0 = merged;
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn joined_len(segments: &[Segment]) -> usize {
    segments
        .iter()
        .enumerate()
        .map(|(i, s)| if i == 0 { s.len } else { s.len + s.sep.len() })
        .sum()
}

fn render(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push_str(segment.sep);
        }
        out.push_str(&segment.text);
    }
    out
}

/// Paragraphs are separated by one or more blank lines.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                paragraphs.push(lines.join("\n"));
                lines.clear();
            }
        } else {
            lines.push(line.trim());
        }
    }
    if !lines.is_empty() {
        paragraphs.push(lines.join("\n"));
    }

    paragraphs
}

/// Split after a terminator that is followed by whitespace or the end.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !SENTENCE_END.contains(&c) {
            continue;
        }
        let at_break = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
        if at_break {
            let end = i + c.len_utf8();
            let sentence = paragraph[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// Cut text longer than `max` chars at the last whitespace inside the
/// window, or exactly at `max` chars when the window has none.
fn hard_split(text: &str, max: usize) -> Vec<(String, &'static str)> {
    let mut pieces = Vec::new();
    let mut rest = text.trim();
    let mut sep = " ";

    while char_len(rest) > max {
        let window_end = rest.char_indices().nth(max).map_or(rest.len(), |(i, _)| i);
        let window = &rest[..window_end];

        match window.rfind(char::is_whitespace) {
            Some(cut) if cut > 0 => {
                pieces.push((window[..cut].trim_end().to_string(), sep));
                rest = rest[cut..].trim_start();
                sep = " ";
            }
            _ => {
                pieces.push((window.to_string(), sep));
                rest = &rest[window_end..];
                sep = "";
            }
        }
    }

    if !rest.is_empty() {
        pieces.push((rest.to_string(), sep));
    }

    pieces
}
