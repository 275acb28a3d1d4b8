//! Output formatting utilities for the CLI.
//!
//! Every command result implements [`CommandOutput`] so it can be printed
//! either for a terminal or as a JSON document under `--json`.

pub mod progress;
pub mod table;

use serde::Serialize;

pub use table::TableFormatter;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to at most `max_chars` characters, appending "..."
/// if truncated. Counts characters, so Hebrew text is never split inside
/// a code point.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
