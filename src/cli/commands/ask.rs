//! Implementation of the `guezi ask` command.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::create_spinner;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{Answer, AnswerLanguage, Config, Grounding};
use crate::infrastructure::setup::AppContext;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,

    /// Language to answer in (en, fr, he)
    #[arg(short, long)]
    pub language: Option<AnswerLanguage>,
}

#[derive(Debug, serde::Serialize)]
pub struct AskOutput {
    #[serde(flatten)]
    pub answer: Answer,
}

impl CommandOutput for AskOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.answer.text.trim().to_string()];

        match &self.answer.grounding {
            Grounding::Grounded => {
                lines.push("\nSources:".to_string());
                for (i, source) in self.answer.sources.iter().enumerate() {
                    lines.push(format!(
                        "  [{}] {} ({}, {:.2}) {}",
                        i + 1,
                        source.reference,
                        source.match_type,
                        source.similarity,
                        truncate(&source.text.split_whitespace().collect::<Vec<_>>().join(" "), 60)
                    ));
                }
            }
            Grounding::NoMatches => {
                lines.push("\n(No matching passages; the answer is not grounded in the corpus.)".to_string());
            }
            Grounding::Unavailable(reason) => {
                lines.push(format!("\n(Retrieval unavailable: {reason}. The answer is not grounded.)"));
            }
        }

        lines.join("\n")
    }
}

pub async fn execute(args: AskArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::from_config(config.clone())
        .await
        .context("Failed to initialize services")?;
    let generator = ctx.generator().context("Failed to create answer generator")?;
    let service = ctx.answer_service(generator);

    let spinner = create_spinner("Searching and generating", !json_mode);
    let answer = service.answer_in(&args.question, args.language).await;
    spinner.finish_and_clear();

    let answer = answer.context("Answer generation failed")?;
    ctx.shutdown().await.context("Failed to close vector store")?;

    output(&AskOutput { answer }, json_mode);
    Ok(())
}
