//! Guezi CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use guezi::cli::commands::{ask, fetch, index, init, search, stats};
use guezi::cli::{handle_error, load_config, Cli, Commands};
use guezi::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        // `init` writes the configuration, so it runs before any is loaded.
        Commands::Init(args) => init::execute(args, cli.json).await,
        command => run(command, cli.config.as_deref(), cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}

async fn run(command: Commands, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    match command {
        Commands::Init(args) => init::execute(args, json).await,
        Commands::Fetch(args) => fetch::execute(args, &config, json).await,
        Commands::Index(args) => index::execute(args, &config, json).await,
        Commands::Search(args) => search::execute(args, &config, json).await,
        Commands::Ask(args) => ask::execute(args, &config, json).await,
        Commands::Stats(args) => stats::execute(args, &config, json).await,
    }
}
