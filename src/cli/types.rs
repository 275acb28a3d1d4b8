//! CLI type definitions
//!
//! This module contains the clap structures that define the CLI interface.
//! Each subcommand's arguments live next to its implementation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    ask::AskArgs, fetch::FetchArgs, index::IndexArgs, init::InitArgs, search::SearchArgs,
    stats::StatsArgs,
};

#[derive(Parser, Debug)]
#[command(name = "guezi")]
#[command(about = "Guezi - hybrid retrieval over the Breslov corpus", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .guezi/config.yaml plus .guezi/local.yaml)
    #[arg(short, long, global = true, env = "GUEZI_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the .guezi directory with a default configuration
    Init(InitArgs),

    /// Download the corpus from Sefaria into the local snapshot file
    Fetch(FetchArgs),

    /// Chunk, embed, and store the fetched corpus
    Index(IndexArgs),

    /// Run a hybrid search and print the ranked passages
    Search(SearchArgs),

    /// Answer a question grounded on retrieved passages
    Ask(AskArgs),

    /// Show index and corpus statistics
    Stats(StatsArgs),
}
