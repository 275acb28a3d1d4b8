//! Implementation of the `guezi init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::setup::{initialize, SetupPaths};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_file: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        if self.success {
            format!(
                "{}\n\nConfiguration written to {}\nNext: `guezi fetch` then `guezi index`.",
                self.message,
                self.config_file.display()
            )
        } else {
            self.message.clone()
        }
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let paths = SetupPaths::in_dir(&target_path);
    let existed = paths.is_initialized();
    let written = initialize(&paths, args.force)?;

    let message = match (written, existed) {
        (false, _) => "Project already initialized. Use --force to overwrite the configuration.",
        (true, true) => "Configuration reset to defaults.",
        (true, false) => "Project initialized successfully.",
    };

    output(
        &InitOutput {
            success: written,
            message: message.to_string(),
            config_file: paths.config_file,
        },
        json_mode,
    );
    Ok(())
}
