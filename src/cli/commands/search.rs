//! Implementation of the `guezi search` command.

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{Config, SearchResult};
use crate::infrastructure::setup::AppContext;
use crate::services::SearchOptions;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query text or a reference such as "Likutei Moharan 1"
    pub query: String,

    /// Minimum similarity for semantic matches (overrides retrieval.semantic_threshold)
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Maximum number of results (overrides retrieval.max_results)
    #[arg(short, long)]
    pub limit: Option<usize>,
}

impl SearchArgs {
    fn options(&self, defaults: SearchOptions) -> Result<SearchOptions> {
        let semantic_threshold = self.threshold.unwrap_or(defaults.semantic_threshold);
        if !(0.0..=1.0).contains(&semantic_threshold) {
            bail!("--threshold must be within [0.0, 1.0], got {semantic_threshold}");
        }
        let max_results = self.limit.unwrap_or(defaults.max_results);
        if max_results == 0 {
            bail!("--limit must be at least 1");
        }
        Ok(SearchOptions {
            semantic_threshold,
            max_results,
        })
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SearchOutput {
    pub query: String,
    pub semantic_threshold: f32,
    pub results: Vec<SearchResult>,
}

impl CommandOutput for SearchOutput {
    fn to_human(&self) -> String {
        if self.results.is_empty() {
            return format!(
                "No passages found for \"{}\" (threshold {:.2}).",
                self.query, self.semantic_threshold
            );
        }
        let exact = self.results.iter().filter(|r| r.is_exact()).count();
        format!(
            "{} result(s), {} exact reference match(es):\n{}",
            self.results.len(),
            exact,
            TableFormatter::new().format_results(&self.results)
        )
    }
}

pub async fn execute(args: SearchArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::from_config(config.clone())
        .await
        .context("Failed to initialize services")?;
    let options = args.options(ctx.retrieval().defaults())?;

    let results = if args.query.trim().is_empty() {
        Vec::new()
    } else {
        let vector = ctx
            .embeddings()
            .embed_query(&args.query)
            .await
            .context("Failed to embed query")?;
        ctx.retrieval()
            .hybrid_search_with(&args.query, &vector, options)
            .await
            .context("Search failed")?
    };

    ctx.shutdown().await.context("Failed to close vector store")?;

    output(
        &SearchOutput {
            query: args.query,
            semantic_threshold: options.semantic_threshold,
            results,
        },
        json_mode,
    );
    Ok(())
}
