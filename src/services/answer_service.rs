//! Question answering over retrieved passages.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Answer, AnswerLanguage, Grounding, SearchResult};
use crate::domain::ports::{AnswerGenerator, GenerationRequest};
use crate::services::embedding_service::EmbeddingService;
use crate::services::retrieval_service::RetrievalService;

/// Retrieves context for a question and asks the generator to answer it.
///
/// Retrieval failures degrade the answer to an ungrounded one; only a
/// generator failure is returned as an error.
pub struct AnswerService {
    embeddings: Arc<EmbeddingService>,
    retrieval: Arc<RetrievalService>,
    generator: Arc<dyn AnswerGenerator>,
}

impl AnswerService {
    pub fn new(
        embeddings: Arc<EmbeddingService>,
        retrieval: Arc<RetrievalService>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            embeddings,
            retrieval,
            generator,
        }
    }

    async fn retrieve(&self, question: &str) -> DomainResult<Vec<SearchResult>> {
        let vector = self.embeddings.embed_query(question).await?;
        self.retrieval.hybrid_search(question, &vector).await
    }

    pub async fn answer(&self, question: &str) -> DomainResult<Answer> {
        self.answer_in(question, None).await
    }

    /// Like [`answer`](Self::answer), asking for the reply in `language`.
    #[instrument(skip_all, fields(generator = self.generator.name(), language = ?language))]
    pub async fn answer_in(
        &self,
        question: &str,
        language: Option<AnswerLanguage>,
    ) -> DomainResult<Answer> {
        let (sources, grounding) = if question.trim().is_empty() {
            (Vec::new(), Grounding::NoMatches)
        } else {
            match self.retrieve(question).await {
                Ok(sources) if sources.is_empty() => (sources, Grounding::NoMatches),
                Ok(sources) => (sources, Grounding::Grounded),
                Err(e) => {
                    warn!(error = %e, "retrieval failed, answering without context");
                    (Vec::new(), Grounding::Unavailable(e.to_string()))
                }
            }
        };

        let request = GenerationRequest::new(question, &sources).with_language(language);
        let text = self.generator.generate(&request).await?;
        info!(sources = sources.len(), grounded = request.is_grounded(), "answered question");

        Ok(Answer {
            question: question.to_string(),
            text,
            sources,
            grounding,
        })
    }
}
