//! Property tests for the semantic chunker.

use std::collections::HashSet;

use guezi::domain::models::{ChunkingConfig, Document};
use guezi::services::SemanticChunker;
use proptest::prelude::*;

const MAX: usize = 150;

fn chunker() -> SemanticChunker {
    SemanticChunker::with_config(ChunkingConfig {
        target_chunk_size: 100,
        min_chunk_size: 30,
        max_chunk_size: MAX,
        overlap_size: 40,
    })
    .unwrap()
}

fn sentence() -> impl Strategy<Value = String> {
    (prop::collection::vec("[a-z]{1,12}", 1..30), any::<bool>()).prop_map(|(words, period)| {
        let mut sentence = words.join(" ");
        if period {
            sentence.push('.');
        }
        sentence
    })
}

fn body() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::collection::vec(sentence(), 1..6), 1..6).prop_map(|paragraphs| {
        paragraphs
            .iter()
            .map(|sentences| sentences.join(" "))
            .collect::<Vec<_>>()
            .join("\n\n")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn chunks_respect_max_size(text in body()) {
        for chunk in chunker().split_text(&text) {
            prop_assert!(chunk.chars().count() <= MAX, "chunk of {} chars", chunk.chars().count());
            prop_assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn every_word_is_covered(text in body()) {
        let chunks = chunker().split_text(&text);
        let covered: HashSet<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        for word in text.split_whitespace() {
            prop_assert!(covered.contains(word), "word {word:?} missing from chunks");
        }
    }

    #[test]
    fn chunk_positions_are_contiguous(text in body()) {
        let document = Document::new("Sichot HaRan", "Sichot HaRan 1", "", text);
        let chunks = chunker().chunk_document(&document);

        prop_assert!(!chunks.is_empty());
        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert_eq!(chunk.chunk_index, i);
            prop_assert_eq!(chunk.total_chunks, chunks.len());
            prop_assert_eq!(&chunk.reference, "Sichot HaRan 1");
        }

        let ids: HashSet<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        prop_assert_eq!(ids.len(), chunks.len());
    }

    #[test]
    fn whitespace_yields_no_chunks(text in "[ \t\n]{0,40}") {
        prop_assert!(chunker().split_text(&text).is_empty());
    }
}
