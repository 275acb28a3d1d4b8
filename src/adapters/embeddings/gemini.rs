//! Gemini embedding provider adapter (`batchEmbedContents`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};
use crate::infrastructure::http::{build_client, ApiError};

const API: &str = "gemini";
pub(crate) const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

pub struct GeminiEmbeddingProvider {
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl GeminiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> DomainResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            DomainError::Configuration(
                "Gemini API key not set. Set GEMINI_API_KEY or configure embedding.api_key."
                    .to_string(),
            )
        })?;

        Ok(Self {
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            client: build_client(Duration::from_secs(config.timeout_secs))?,
        })
    }

    async fn batch_embed(&self, texts: &[&str], task_type: TaskType) -> DomainResult<Vec<Vec<f32>>> {
        let model = format!("models/{}", self.model);
        let url = format!("{}/{model}:batchEmbedContents", self.base_url);

        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &model,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                    task_type,
                    output_dimensionality: self.dimension,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::network(API, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(API, status, &body).into());
        }

        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| ApiError::malformed(API, format!("failed to parse embedding response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(ApiError::malformed(
                API,
                format!("expected {} embeddings, got {}", texts.len(), parsed.embeddings.len()),
            )
            .into());
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    fn name(&self) -> &'static str {
        API
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, inputs: &[EmbeddingInput]) -> DomainResult<Vec<EmbeddingOutput>> {
        let mut outputs = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(MAX_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|i| i.text.as_str()).collect();
            let vectors = self.batch_embed(&texts, TaskType::RetrievalDocument).await?;
            outputs.extend(batch.iter().zip(vectors).map(|(input, vector)| EmbeddingOutput {
                id: input.id.clone(),
                vector,
            }));
        }
        Ok(outputs)
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    /// Queries are embedded with the retrieval-query task type.
    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        self.batch_embed(&[text], TaskType::RetrievalQuery)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::DataIntegrity("gemini returned no query embedding".to_string()))
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}
