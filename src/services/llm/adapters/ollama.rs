//! Ollama adapter implementing LlmClient trait
//!
//! Talks to a local Ollama server through `/api/chat` with streaming disabled.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::services::retry::{with_retry, RetryConfig};

use super::super::errors::LlmError;
use super::super::traits::LlmClient;
use super::super::types::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmConfig, TokenUsage,
};

pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
    max_retries: usize,
    top_k: Option<u32>,
    top_p: Option<f32>,
    repeat_penalty: Option<f32>,
}

impl OllamaClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let base_url = config.resolved_base_url();
        if base_url.is_empty() {
            return Err(LlmError::ConfigurationError {
                message: "Ollama base URL cannot be empty".to_string(),
            });
        }

        let model = config.resolved_model();
        if model.trim().is_empty() {
            return Err(LlmError::ConfigurationError {
                message: "Ollama chat model cannot be empty".to_string(),
            });
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::ConfigurationError {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            model,
            timeout,
            max_retries: config.max_retries,
            top_k: config.top_k,
            top_p: config.top_p,
            repeat_penalty: config.repeat_penalty,
        })
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatBody<'a> {
        ChatBody {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                stop: &request.stop,
                top_k: self.top_k,
                top_p: self.top_p,
                repeat_penalty: self.repeat_penalty,
            },
        }
    }

    async fn complete_once(&self, request: &CompletionRequest) -> Result<ChatReply, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let timeout_secs = self.timeout.as_secs();

        let response = timeout(
            self.timeout,
            self.client.post(&url).json(&self.build_body(request)).send(),
        )
        .await
        .map_err(|_| LlmError::Timeout { timeout_secs })?
        .map_err(|e| LlmError::from_reqwest_error(e, timeout_secs))?;

        parse_json(response, timeout_secs).await
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: Response,
    timeout_secs: u64,
) -> Result<T, LlmError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::from_reqwest_error(e, timeout_secs))?;

    if !status.is_success() {
        return Err(LlmError::from_status_and_body(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| LlmError::ParseError {
        message: format!("Failed to parse Ollama response: {e}"),
    })
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let started = std::time::Instant::now();
        let retry_config = RetryConfig::new(self.max_retries).with_attempt_timeout(self.timeout);

        let reply = with_retry(retry_config, || self.complete_once(&request))
            .await
            .map_err(|e| e.into_inner())?;

        tracing::debug!(
            model = %self.model,
            duration_ms = started.elapsed().as_millis() as u64,
            output_tokens = ?reply.eval_count,
            "Ollama chat completed"
        );

        Ok(CompletionResponse {
            text: reply.message.content,
            token_usage: Some(TokenUsage {
                input_tokens: reply.prompt_eval_count,
                output_tokens: reply.eval_count,
                total_tokens: match (reply.prompt_eval_count, reply.eval_count) {
                    (Some(input), Some(output)) => Some(input + output),
                    _ => None,
                },
            }),
            model_used: reply.model,
            finish_reason: reply.done_reason,
        })
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        let timeout_secs = self.timeout.as_secs();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest_error(e, timeout_secs))?;

        let tags: TagList = parse_json(response, timeout_secs).await?;
        if tags.has_model(&self.model) {
            Ok(())
        } else {
            Err(LlmError::ProviderUnavailable {
                message: format!(
                    "Model '{}' is not pulled on the Ollama server; run `ollama pull {}`",
                    self.model, self.model
                ),
            })
        }
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions<'a>,
}

#[derive(Serialize)]
struct ChatOptions<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "no_stop")]
    stop: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_penalty: Option<f32>,
}

fn no_stop(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    model: Option<String>,
    message: ReplyMessage,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagList {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

impl TagList {
    /// Ollama reports untagged pulls as `name:latest`
    pub(crate) fn has_model(&self, model: &str) -> bool {
        self.models.iter().any(|entry| {
            entry.name == model
                || entry
                    .name
                    .strip_suffix(":latest")
                    .is_some_and(|base| base == model)
        })
    }
}
