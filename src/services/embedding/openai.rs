use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::services::retry::{with_retry, RetryConfig};

use super::config::EmbeddingConfig;
use super::errors::EmbeddingError;
use super::traits::EmbeddingProvider;

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
    max_retries: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| EmbeddingError::ConfigurationError {
                message: "An API key is required for OpenAI embeddings".to_string(),
            })?
            .to_string();

        let model = config.resolved_model();
        if model.trim().is_empty() {
            return Err(EmbeddingError::ConfigurationError {
                message: "OpenAI embedding model cannot be empty".to_string(),
            });
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            EmbeddingError::ConfigurationError {
                message: format!("Failed to create HTTP client: {e}"),
            }
        })?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.resolved_base_url()),
            api_key,
            model,
            timeout,
            max_retries: config.max_retries,
        })
    }

    async fn embed_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let timeout_secs = self.timeout.as_secs();
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = timeout(
            self.timeout,
            self.client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send(),
        )
        .await
        .map_err(|_| EmbeddingError::Timeout { timeout_secs })?
        .map_err(|e| EmbeddingError::from_reqwest_error(e, timeout_secs))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EmbeddingError::from_reqwest_error(e, timeout_secs))?;

        if !status.is_success() {
            return Err(EmbeddingError::from_status_and_body(status, &text));
        }

        let parsed: EmbeddingResponse =
            serde_json::from_str(&text).map_err(|e| EmbeddingError::ParseError {
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        into_ordered_vectors(parsed, texts.len())
    }
}

/// Entries carry their input position; order by it rather than arrival
fn into_ordered_vectors(
    mut parsed: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    parsed.data.sort_by_key(|entry| entry.index);
    if parsed.data.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: parsed.data.len(),
        });
    }
    Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let retry_config = RetryConfig::new(self.max_retries).with_attempt_timeout(self.timeout);
        with_retry(retry_config, || self.embed_once(texts))
            .await
            .map_err(|e| e.into_inner())
    }

    fn provider_name(&self) -> &'static str {
        "open-ai"
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }

    async fn health_check(&self) -> Result<(), EmbeddingError> {
        self.embed("health check").await.map(|_| ())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
