//! Implementation of the `guezi index` command.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::commands::fetch::fetch_references;
use crate::cli::output::{output, CommandOutput};
use crate::cli::{create_progress_bar, ProgressBarExt};
use crate::domain::models::Config;
use crate::infrastructure::setup::AppContext;
use crate::services::{IndexOptions, IndexReport};

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Clear the store before indexing
    #[arg(long)]
    pub rebuild: bool,

    /// Fetch the corpus again before indexing
    #[arg(long)]
    pub refetch: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct IndexOutput {
    pub backend: &'static str,
    pub rebuild: bool,
    #[serde(flatten)]
    pub report: IndexReport,
}

impl CommandOutput for IndexOutput {
    fn to_human(&self) -> String {
        let r = &self.report;
        let mut lines = vec![
            format!(
                "Indexed {} chunk(s) from {} document(s) into the {} store",
                r.vectors_stored, r.documents, self.backend
            ),
            format!("  Store now holds {} chunk(s)", r.store_count),
        ];
        if r.skipped_documents > 0 {
            lines.push(format!("  Skipped {} empty document(s)", r.skipped_documents));
        }
        if r.duplicate_chunks > 0 {
            lines.push(format!("  Dropped {} duplicate chunk id(s)", r.duplicate_chunks));
        }
        if r.replaced_chunks > 0 {
            lines.push(format!("  Replaced {} previously stored chunk(s)", r.replaced_chunks));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: IndexArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::from_config(config.clone())
        .await
        .context("Failed to initialize services")?;
    let corpus = ctx.corpus_file();

    let snapshot = if args.refetch {
        let (report, source) = fetch_references(config, &config.fetcher.books, json_mode).await?;
        let snapshot = report.into_snapshot(source);
        corpus
            .save(&snapshot)
            .await
            .with_context(|| format!("Failed to write corpus to {}", corpus.path().display()))?;
        snapshot
    } else {
        corpus.load().await.context("Failed to load corpus")?
    };

    let indexer = ctx.indexing_service()?;
    let pb = create_progress_bar(0, !json_mode);
    let result = indexer
        .index_documents(
            &snapshot.documents,
            IndexOptions {
                rebuild: args.rebuild,
            },
            |stored, total| {
                pb.set_length(total as u64);
                pb.set_progress(stored as u64, "embedding");
            },
        )
        .await;

    let report = match result {
        Ok(report) => {
            pb.finish_success(format!("{} vector(s) stored", report.vectors_stored));
            report
        }
        Err(e) => {
            // No shutdown: closing the local index would flush a partial rebuild.
            pb.finish_error("indexing failed");
            return Err(e).context("Indexing failed");
        }
    };

    ctx.shutdown().await.context("Failed to close vector store")?;

    output(
        &IndexOutput {
            backend: ctx.store().backend(),
            rebuild: args.rebuild,
            report,
        },
        json_mode,
    );
    Ok(())
}
