//! Corpus download from a text source.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::domain::models::{CorpusSnapshot, Document};
use crate::domain::ports::TextSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub reference: String,
    pub error: String,
}

/// Documents fetched plus the references that could not be fetched
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub documents: Vec<Document>,
    pub failures: Vec<FetchFailure>,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_snapshot(self, source: &str) -> CorpusSnapshot {
        CorpusSnapshot::new(source, self.documents)
    }
}

/// Fetch each reference in turn. A failing reference is recorded and
/// does not abort the rest of the corpus.
#[instrument(skip_all, fields(source = source.name(), references = references.len()))]
pub async fn fetch_corpus(
    source: &dyn TextSource,
    references: &[String],
    mut on_reference: impl FnMut(&str, usize) + Send,
) -> FetchReport {
    let mut report = FetchReport::default();

    for reference in references {
        match source.fetch(reference).await {
            Ok(documents) => {
                info!(reference = %reference, documents = documents.len(), "fetched");
                on_reference(reference, documents.len());
                report.documents.extend(documents);
            }
            Err(e) => {
                warn!(reference = %reference, error = %e, "fetch failed");
                on_reference(reference, 0);
                report.failures.push(FetchFailure {
                    reference: reference.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    report
}
