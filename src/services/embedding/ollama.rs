use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::services::llm::adapters::ollama::TagList;
use crate::services::retry::{with_retry, RetryConfig};

use super::config::EmbeddingConfig;
use super::errors::EmbeddingError;
use super::traits::EmbeddingProvider;

/// Embeddings from a local Ollama server via `/api/embed`
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
    max_retries: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let model = config.resolved_model();
        if model.trim().is_empty() {
            return Err(EmbeddingError::ConfigurationError {
                message: "Ollama embedding model cannot be empty".to_string(),
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
            base_url: config.resolved_base_url(),
            model,
            timeout,
            max_retries: config.max_retries,
        })
    }

    async fn embed_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/api/embed", self.base_url);
        let timeout_secs = self.timeout.as_secs();
        let body = EmbedBody {
            model: &self.model,
            input: texts,
        };

        let response = timeout(self.timeout, self.client.post(&url).json(&body).send())
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

        let reply: EmbedReply =
            serde_json::from_str(&text).map_err(|e| EmbeddingError::ParseError {
                message: format!("Failed to parse Ollama embeddings: {e}"),
            })?;

        if reply.embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: reply.embeddings.len(),
            });
        }

        Ok(reply.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
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
        "ollama"
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }

    async fn health_check(&self) -> Result<(), EmbeddingError> {
        let url = format!("{}/api/tags", self.base_url);
        let timeout_secs = self.timeout.as_secs();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EmbeddingError::from_reqwest_error(e, timeout_secs))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EmbeddingError::from_reqwest_error(e, timeout_secs))?;
        if !status.is_success() {
            return Err(EmbeddingError::from_status_and_body(status, &text));
        }

        let tags: TagList = serde_json::from_str(&text).map_err(|e| EmbeddingError::ParseError {
            message: format!("Failed to parse Ollama model list: {e}"),
        })?;
        if tags.has_model(&self.model) {
            Ok(())
        } else {
            Err(EmbeddingError::ProviderUnavailable {
                message: format!("Embedding model '{}' is not pulled", self.model),
            })
        }
    }
}

#[derive(Serialize)]
struct EmbedBody<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedReply {
    embeddings: Vec<Vec<f32>>,
}
