//! Command-line interface.
//!
//! `main` parses [`Cli`], loads configuration, initializes logging, and
//! dispatches to one `commands::*::execute` per subcommand. Errors come
//! back as `anyhow::Error` and are rendered by [`handle_error`].

pub mod commands;
pub mod output;
pub mod types;

use anyhow::Result;
use std::path::Path;

use crate::domain::errors::DomainError;
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::SecretScrubber;

pub use output::progress::{create_progress_bar, create_spinner, ProgressBarExt};
pub use types::{Cli, Commands};

/// Load configuration from `path`, or from the default `.guezi` files.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Follow-up advice for errors the user can act on.
fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    match err.downcast_ref::<DomainError>()? {
        DomainError::DataIntegrity(_) => Some("Rebuild the index with `guezi index --rebuild`."),
        DomainError::Configuration(_) => {
            Some("Check .guezi/config.yaml or the GUEZI_* environment variables.")
        }
        DomainError::RetrievalUnavailable(_) => Some("Check that the vector store is reachable."),
        _ => None,
    }
}

/// Print `err` with its context chain and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let scrubber = SecretScrubber::global();
    let message = scrubber.scrub(&format!("{err:#}"));
    let hint = hint_for(&err);

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": message,
            "hint": hint,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {message}", console::style("Error:").red().bold());
        if let Some(hint) = hint {
            eprintln!("{} {hint}", console::style("Hint:").yellow());
        }
    }

    std::process::exit(1);
}
