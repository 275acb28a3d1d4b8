//! Flattening of Sefaria's nested `text` / `he` arrays into documents.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::domain::models::Document;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<[^>]*>").unwrap_or_else(|e| panic!("invalid tag pattern: {e}"))
});

static FOOTNOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<sup[^>]*>.*?</sup>\s*<i class="footnote">.*?</i>"#)
        .unwrap_or_else(|e| panic!("invalid footnote pattern: {e}"))
});

static SPACES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t\u{a0}]+").unwrap_or_else(|e| panic!("invalid whitespace pattern: {e}"))
});

/// Strip markup and decode the handful of entities Sefaria emits.
pub fn clean_text(raw: &str) -> String {
    let without_notes = FOOTNOTE.replace_all(raw, "");
    let with_breaks = without_notes.replace("<br>", "\n").replace("<br/>", "\n");
    let stripped = TAG.replace_all(&with_breaks, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    SPACES.replace_all(&decoded, " ").trim().to_string()
}

/// Paragraph separator between the leaves of one section.
const PARAGRAPH_BREAK: &str = "\n\n";

/// Flatten parallel Hebrew / English trees into one document per
/// top-level section.
///
/// A book reference yields `"{reference} {n}"` for each section; a
/// reference that already names a section (ends in a number) yields a
/// single document under that reference. Either way every leaf below a
/// section is joined into its text, one paragraph per leaf, so exact
/// reference lookups see the whole section. Sections empty in both
/// languages are dropped.
pub fn flatten(title: &str, reference: &str, hebrew: &Value, english: &Value) -> Vec<Document> {
    if reference.ends_with(|c: char| c.is_ascii_digit()) {
        return section(title, reference, hebrew, english).into_iter().collect();
    }

    let he = as_items(hebrew);
    let en = as_items(english);
    (0..he.len().max(en.len()))
        .filter_map(|i| {
            section(
                title,
                &format!("{reference} {}", i + 1),
                he.get(i).unwrap_or(&Value::Null),
                en.get(i).unwrap_or(&Value::Null),
            )
        })
        .collect()
}

fn section(title: &str, reference: &str, hebrew: &Value, english: &Value) -> Option<Document> {
    let document = Document::new(title, reference, joined_leaves(hebrew), joined_leaves(english));
    (!document.is_empty()).then_some(document)
}

/// Array children, or a lone string treated as the first child.
fn as_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(_) => vec![value.clone()],
        _ => Vec::new(),
    }
}

/// Every non-blank leaf under `value` in document order.
fn joined_leaves(value: &Value) -> String {
    let mut leaves = Vec::new();
    collect_leaves(value, &mut leaves);
    leaves.join(PARAGRAPH_BREAK)
}

fn collect_leaves(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(raw) => {
            let text = clean_text(raw);
            if !text.is_empty() {
                out.push(text);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_leaves(item, out)),
        _ => {}
    }
}
