//! Gemini `generateContent` answer generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::adapters::embeddings::gemini::DEFAULT_BASE_URL;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::GenerationConfig;
use crate::domain::ports::{AnswerGenerator, GenerationRequest};
use crate::infrastructure::http::{build_client, ApiError};
use crate::services::prompt::PromptBuilder;

const API: &str = "gemini";

pub struct GeminiGenerator {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    prompt: PromptBuilder,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> DomainResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            DomainError::Configuration(
                "Gemini API key not set. Set GEMINI_API_KEY or configure generation.api_key."
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
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            prompt: PromptBuilder::new(config.max_source_chars),
            client: build_client(Duration::from_secs(config.timeout_secs))?,
        })
    }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    fn name(&self) -> &'static str {
        API
    }

    async fn generate(&self, request: &GenerationRequest) -> DomainResult<String> {
        let prompt = self.prompt.build(request);
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationParams {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                top_p: 0.9,
            },
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

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ApiError::malformed(API, format!("failed to parse generation response: {e}")))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ApiError::malformed(API, "response has no candidate text"))?;

        debug!(chars = text.len(), grounded = request.is_grounded(), "generated answer");
        Ok(text)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationParams,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = GeminiGenerator::new(&GenerationConfig::default()).err().unwrap();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn test_response_parts_are_concatenated() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Joy "},{"text":"matters."}]}}]}"#,
        )
        .unwrap();
        let content = parsed.candidates.into_iter().next().unwrap().content.unwrap();
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        assert_eq!(text, "Joy matters.");
    }
}
