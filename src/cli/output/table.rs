//! Table output formatting for CLI commands
//!
//! Renders search results with comfy-table. Match types are color-coded
//! when the terminal supports it and marked with an icon otherwise.

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::env;

use crate::cli::output::truncate;
use crate::domain::models::{MatchType, SearchResult};

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
    /// Characters of passage text shown per row
    preview_chars: usize,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
            preview_chars: 120,
        }
    }

    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
            preview_chars: 120,
        }
    }

    /// Format ranked search results as a table
    pub fn format_results(&self, results: &[SearchResult]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Reference").add_attribute(Attribute::Bold),
            Cell::new("Chunk").add_attribute(Attribute::Bold),
            Cell::new("Match").add_attribute(Attribute::Bold),
            Cell::new("Score").add_attribute(Attribute::Bold),
            Cell::new("Text").add_attribute(Attribute::Bold),
        ]);

        for (rank, result) in results.iter().enumerate() {
            let match_cell = if self.use_colors {
                Cell::new(result.match_type.to_string()).fg(match_color(result.match_type))
            } else {
                Cell::new(format!("{} {}", match_icon(result.match_type), result.match_type))
            };

            let preview = result.text.split_whitespace().collect::<Vec<_>>().join(" ");

            table.add_row(vec![
                Cell::new(rank + 1),
                Cell::new(&result.reference),
                Cell::new(format!("{}/{}", result.chunk_index + 1, result.total_chunks)),
                match_cell,
                Cell::new(format!("{:.3}", result.similarity)).set_alignment(CellAlignment::Right),
                Cell::new(truncate(&preview, self.preview_chars)),
            ]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    if env::var("TERM").is_ok_and(|term| term == "dumb") {
        return false;
    }
    console::colors_enabled()
}

const fn match_color(match_type: MatchType) -> Color {
    match match_type {
        MatchType::ExactReference => Color::Green,
        MatchType::Semantic => Color::Cyan,
    }
}

const fn match_icon(match_type: MatchType) -> &'static str {
    match match_type {
        MatchType::ExactReference => "●",
        MatchType::Semantic => "○",
    }
}
