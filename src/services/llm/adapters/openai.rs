//! OpenAI-compatible adapter implementing LlmClient trait
//!
//! Serves both OpenAI and xAI Grok, which exposes the same
//! `/chat/completions` contract under a different base URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::services::retry::{with_retry, RetryConfig};

use super::super::errors::LlmError;
use super::super::traits::LlmClient;
use super::super::types::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmConfig, LlmProvider, TokenUsage,
};

pub struct OpenAiCompatibleClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    max_retries: usize,
}

impl OpenAiCompatibleClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::ConfigurationError {
                message: format!("An API key is required for the {} provider", config.provider),
            })?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::ConfigurationError {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            provider: config.provider,
            base_url: config.resolved_base_url(),
            model: config.resolved_model(),
            api_key: api_key.trim().to_string(),
            timeout,
            max_retries: config.max_retries,
        })
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatBody<'a> {
        ChatBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stop: if request.stop.is_empty() {
                None
            } else {
                Some(&request.stop)
            },
        }
    }

    async fn complete_once(&self, request: &CompletionRequest) -> Result<ChatReply, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let timeout_secs = self.timeout.as_secs();

        let response = timeout(
            self.timeout,
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&self.build_body(request))
                .send(),
        )
        .await
        .map_err(|_| LlmError::Timeout { timeout_secs })?
        .map_err(|e| LlmError::from_reqwest_error(e, timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::from_reqwest_error(e, timeout_secs))?;

        if !status.is_success() {
            return Err(LlmError::from_status_and_body(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| LlmError::ParseError {
            message: format!("Failed to parse chat completion: {e}"),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let retry_config = RetryConfig::new(self.max_retries).with_attempt_timeout(self.timeout);

        let reply = with_retry(retry_config, || self.complete_once(&request))
            .await
            .map_err(|e| e.into_inner())?;

        let model_used = reply.model;
        let usage = reply.usage;
        let choice = reply
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                message: "Chat completion contained no choices".to_string(),
            })?;

        Ok(CompletionResponse {
            text: choice.message.content.unwrap_or_default(),
            token_usage: usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model_used,
            finish_reason: choice.finish_reason,
        })
    }

    fn provider_name(&self) -> &'static str {
        match self.provider {
            LlmProvider::Xai => "xai",
            _ => "open-ai",
        }
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let url = format!("{}/models", self.base_url);
        let timeout_secs = self.timeout.as_secs();
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest_error(e, timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(LlmError::from_status_and_body(status, &body))
        }
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    model: Option<String>,
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}
