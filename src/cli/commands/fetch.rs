//! Implementation of the `guezi fetch` command.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::cli::{create_progress_bar, ProgressBarExt};
use crate::domain::models::Config;
use crate::domain::ports::TextSource;
use crate::infrastructure::corpus::CorpusFile;
use crate::infrastructure::setup::text_source;
use crate::services::{fetch_corpus, FetchFailure, FetchReport};

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Books to fetch instead of the configured list (repeatable)
    #[arg(short, long = "book")]
    pub books: Vec<String>,

    /// Write the corpus here instead of fetcher.corpus_path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, serde::Serialize)]
pub struct FetchOutput {
    pub success: bool,
    pub corpus_file: PathBuf,
    pub references: usize,
    pub documents: usize,
    pub failures: Vec<FetchFailure>,
}

impl CommandOutput for FetchOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Fetched {} document(s) from {} reference(s) into {}",
            self.documents,
            self.references,
            self.corpus_file.display()
        )];
        if !self.failures.is_empty() {
            lines.push(format!("\n{} reference(s) failed:", self.failures.len()));
            for failure in &self.failures {
                lines.push(format!("  - {}: {}", failure.reference, failure.error));
            }
        }
        lines.join("\n")
    }
}

/// Fetch `references` from the configured source with a progress bar.
pub(crate) async fn fetch_references(
    config: &Config,
    references: &[String],
    json_mode: bool,
) -> Result<(FetchReport, &'static str)> {
    let source = text_source(config).context("Failed to create Sefaria client")?;

    let pb = create_progress_bar(references.len() as u64, !json_mode);
    let mut done = 0;
    let report = fetch_corpus(&source, references, |reference, _| {
        done += 1;
        pb.set_progress(done, reference.to_string());
    })
    .await;

    if report.documents.is_empty() {
        pb.finish_error("nothing fetched");
        let reasons: Vec<String> = report
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.reference, f.error))
            .collect();
        bail!("No documents fetched ({})", reasons.join("; "));
    }
    pb.finish_success(format!("{} document(s)", report.documents.len()));

    Ok((report, source.name()))
}

pub async fn execute(args: FetchArgs, config: &Config, json_mode: bool) -> Result<()> {
    let references = if args.books.is_empty() {
        config.fetcher.books.clone()
    } else {
        args.books
    };
    if references.is_empty() {
        bail!("No books to fetch; set fetcher.books or pass --book");
    }

    let corpus = CorpusFile::new(args.output.unwrap_or_else(|| config.fetcher.corpus_path.clone()));
    let (report, source) = fetch_references(config, &references, json_mode).await?;

    let failures = report.failures.clone();
    let snapshot = report.into_snapshot(source);
    let documents = snapshot.documents.len();
    corpus
        .save(&snapshot)
        .await
        .with_context(|| format!("Failed to write corpus to {}", corpus.path().display()))?;

    output(
        &FetchOutput {
            success: failures.is_empty(),
            corpus_file: corpus.path().to_path_buf(),
            references: references.len(),
            documents,
            failures,
        },
        json_mode,
    );
    Ok(())
}
