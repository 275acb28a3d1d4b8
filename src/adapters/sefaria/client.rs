use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::text::flatten;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Document, FetcherConfig};
use crate::domain::ports::TextSource;
use crate::infrastructure::http::{build_client, ApiError, RateLimiter, RetryPolicy};

const API: &str = "sefaria";

/// Sefaria `texts` API client
pub struct SefariaClient {
    base_url: Url,
    client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    r#ref: Option<String>,
    #[serde(default)]
    index_title: Option<String>,
    #[serde(default)]
    book: Option<String>,
    #[serde(default)]
    text: Value,
    #[serde(default)]
    he: Value,
}

impl SefariaClient {
    pub fn new(
        config: &FetcherConfig,
        rate_limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> DomainResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DomainError::Configuration(format!("invalid fetcher.base_url {}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DomainError::Configuration(format!(
                "fetcher.base_url {} cannot carry a path",
                config.base_url
            )));
        }

        Ok(Self {
            base_url,
            client: build_client(Duration::from_secs(config.timeout_secs))?,
            rate_limiter,
            retry,
        })
    }

    fn text_url(&self, reference: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("texts").push(reference);
        }
        url.query_pairs_mut()
            .append_pair("context", "0")
            .append_pair("commentary", "0");
        url
    }

    async fn fetch_once(&self, reference: &str) -> DomainResult<Vec<Document>> {
        self.rate_limiter.acquire().await;

        let response = self
            .client
            .get(self.text_url(reference))
            .send()
            .await
            .map_err(|e| ApiError::network(API, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(API, status, &body).into());
        }

        let payload: TextResponse = response
            .json()
            .await
            .map_err(|e| ApiError::malformed(API, format!("unexpected texts payload: {e}")))?;

        // Unknown references come back as 200 with an error field
        if let Some(error) = payload.error {
            return Err(DomainError::NotFound(format!("{reference}: {error}")));
        }

        let title = payload
            .index_title
            .or(payload.book)
            .unwrap_or_else(|| reference.to_string());
        let base_reference = payload.r#ref.unwrap_or_else(|| reference.to_string());

        let documents = flatten(&title, &base_reference, &payload.he, &payload.text);
        debug!(reference, documents = documents.len(), "fetched text");
        Ok(documents)
    }
}

#[async_trait]
impl TextSource for SefariaClient {
    fn name(&self) -> &'static str {
        API
    }

    #[instrument(skip(self))]
    async fn fetch(&self, reference: &str) -> DomainResult<Vec<Document>> {
        self.retry
            .execute("sefaria.fetch", || self.fetch_once(reference))
            .await
    }
}
