//! Answer generator port.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AnswerLanguage, SearchResult};

/// One retrieved passage handed to the generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextPassage {
    pub reference: String,
    pub title: String,
    pub text: String,
    pub similarity: f32,
}

impl From<&SearchResult> for ContextPassage {
    fn from(result: &SearchResult) -> Self {
        Self {
            reference: result.reference.clone(),
            title: result.title.clone(),
            text: result.text.clone(),
            similarity: result.similarity,
        }
    }
}

/// The question plus ordered grounding context.
///
/// `context` is empty when retrieval found nothing or was unavailable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationRequest {
    pub question: String,
    pub context: Vec<ContextPassage>,
    /// Requested reply language; `None` leaves it to the model
    pub language: Option<AnswerLanguage>,
}

impl GenerationRequest {
    pub fn new(question: impl Into<String>, results: &[SearchResult]) -> Self {
        Self {
            question: question.into(),
            context: results.iter().map(ContextPassage::from).collect(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: Option<AnswerLanguage>) -> Self {
        self.language = language;
        self
    }

    pub fn is_grounded(&self) -> bool {
        !self.context.is_empty()
    }
}

/// A language model that answers from retrieved context.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &GenerationRequest) -> DomainResult<String>;
}
