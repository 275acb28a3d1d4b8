//! OpenAI embedding provider adapter.
//!
//! Talks to the `/embeddings` endpoint. Compatible with any
//! OpenAI-compatible embedding API (Azure OpenAI, local servers).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};
use crate::infrastructure::http::{build_client, ApiError};

const API: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_BATCH_SIZE: usize = 2048;

/// Models that accept a `dimensions` request parameter
const SHORTENABLE_MODELS: [&str; 2] = ["text-embedding-3-small", "text-embedding-3-large"];

/// OpenAI embedding provider.
pub struct OpenAiEmbeddingProvider {
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> DomainResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            DomainError::Configuration(
                "OpenAI API key not set. Set OPENAI_API_KEY or configure embedding.api_key."
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

    async fn call_embeddings_api(&self, texts: Vec<String>) -> DomainResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let expected = texts.len();

        let request_body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
            dimensions: SHORTENABLE_MODELS
                .contains(&self.model.as_str())
                .then_some(self.dimension),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ApiError::network(API, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(API, status, &body).into());
        }

        let result: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| ApiError::malformed(API, format!("failed to parse embedding response: {e}")))?;

        if result.data.len() != expected {
            return Err(ApiError::malformed(
                API,
                format!("expected {expected} embeddings, got {}", result.data.len()),
            )
            .into());
        }

        // Sort by index to maintain input order
        let mut data = result.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        API
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, inputs: &[EmbeddingInput]) -> DomainResult<Vec<EmbeddingOutput>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_outputs = Vec::with_capacity(inputs.len());
        for chunk_inputs in inputs.chunks(MAX_BATCH_SIZE) {
            let texts = chunk_inputs.iter().map(|i| i.text.clone()).collect();
            let vectors = self.call_embeddings_api(texts).await?;

            all_outputs.extend(chunk_inputs.iter().zip(vectors).map(|(input, vector)| {
                EmbeddingOutput {
                    id: input.id.clone(),
                    vector,
                }
            }));
        }

        Ok(all_outputs)
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }
}

// -- OpenAI API request/response types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
