//! Canonical reference recognition for free-text queries.
//!
//! Maps phrasings like "LM 64", "the first teaching", or "the seven
//! beggars" onto the corpus's canonical references so that exact-reference
//! search can find them without relying on embedding similarity.

use regex::Regex;

const NUMBER_WORDS: [(&str, &str); 15] = [
    ("first", "1"),
    ("second", "2"),
    ("third", "3"),
    ("fourth", "4"),
    ("fifth", "5"),
    ("sixth", "6"),
    ("seventh", "7"),
    ("eighth", "8"),
    ("ninth", "9"),
    ("tenth", "10"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
];

/// Patterns are tried in order; the first match wins. `{}` in the
/// template is replaced by the captured number.
const REFERENCE_PATTERNS: [(&str, &str); 16] = [
    (
        r"likute?[iy]?\s*moharan,?\s*(?:part\s*(?:ii|2)|ii|tinyana)\b\s*[,:]?\s*(\d+)",
        "Likutei Moharan, Part II {}",
    ),
    (r"likute?[iy]?\s*moharan\s*(\d+)", "Likutei Moharan {}"),
    (r"\blm\s*(\d+)", "Likutei Moharan {}"),
    (r"\btorah\s*(\d+)", "Likutei Moharan {}"),
    (r"\bteaching\s*(\d+)", "Likutei Moharan {}"),
    (r"\blesson\s*(\d+)", "Likutei Moharan {}"),
    (r"sippure?[iy]?\s*maasiy?ot\s*(\d+)", "Sippurei Maasiyot {}"),
    (r"\btale\s*(\d+)", "Sippurei Maasiyot {}"),
    (r"\bstory\s*(\d+)", "Sippurei Maasiyot {}"),
    (r"sichot\s*ha?ran\s*(\d+)", "Sichot HaRan {}"),
    (r"\bconversation\s*(\d+)", "Sichot HaRan {}"),
    (r"chaye?[iy]?\s*moharan\s*(\d+)", "Chayei Moharan {}"),
    (r"likute?[iy]?\s*tefilot\s*(\d+)", "Likutei Tefilot, Volume I {}"),
    (r"\bprayer\s*(\d+)", "Likutei Tefilot, Volume I {}"),
    (r"tikkun\s*ha?klali", "Tikkun HaKlali"),
    (r"seven\s*beggars", "Sippurei Maasiyot 13"),
];

/// Recognizes canonical references in user queries
#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    number_rewrites: Vec<(Regex, String)>,
    patterns: Vec<(Regex, &'static str)>,
}

impl ReferenceExtractor {
    pub fn new() -> Self {
        let number_rewrites = NUMBER_WORDS
            .iter()
            .map(|(word, digit)| {
                let pattern = format!(r"\b{word}\s+(teaching|lesson|torah|tale|story|prayer)\b");
                (compile(&pattern), format!("$1 {digit}"))
            })
            .collect();

        let patterns = REFERENCE_PATTERNS
            .iter()
            .map(|(pattern, template)| (compile(pattern), *template))
            .collect();

        Self {
            number_rewrites,
            patterns,
        }
    }

    /// The canonical reference named in `query`, if any.
    pub fn extract(&self, query: &str) -> Option<String> {
        let mut normalized = query.to_lowercase();
        for (pattern, replacement) in &self.number_rewrites {
            normalized = pattern
                .replace_all(&normalized, replacement.as_str())
                .into_owned();
        }

        self.patterns.iter().find_map(|(pattern, template)| {
            let captures = pattern.captures(&normalized)?;
            Some(match captures.get(1) {
                Some(number) => template.replace("{}", number.as_str()),
                None => (*template).to_string(),
            })
        })
    }
}

impl Default for ReferenceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid reference pattern {pattern}: {e}"))
}
