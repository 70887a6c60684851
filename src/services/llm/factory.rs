//! LLM client factory for provider selection
//!
//! This module provides a factory for creating LLM clients based on
//! configuration or environment variables.

use std::sync::Arc;

use crate::env::{apis as env_apis, llm as env_llm};

use super::adapters::{OllamaClient, OpenAiCompatibleClient};
use super::errors::LlmError;
use super::traits::LlmClient;
use super::types::{LlmConfig, LlmProvider};

/// Factory for creating LLM clients based on provider configuration
pub struct LlmClientFactory;

impl LlmClientFactory {
    /// Create an LLM client based on configuration
    pub fn create(config: LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
        match config.provider {
            LlmProvider::Ollama => Ok(Arc::new(OllamaClient::new(config)?)),
            LlmProvider::OpenAi | LlmProvider::Xai => {
                Ok(Arc::new(OpenAiCompatibleClient::new(config)?))
            }
        }
    }

    /// Create an LLM client from environment variables
    ///
    /// Environment variables checked:
    /// - DOCQA_LLM_PROVIDER: "ollama" | "open-ai" | "xai"
    /// - DOCQA_LLM_MODEL: Model identifier (provider-specific)
    /// - OLLAMA_BASE_URL / OLLAMA_CHAT_MODEL for the ollama provider
    /// - OPENAI_API_KEY / OPENAI_BASE_URL for the open-ai provider
    /// - XAI_API_KEY for the xai provider
    pub fn from_env() -> Result<Arc<dyn LlmClient>, LlmError> {
        let provider = match std::env::var(env_llm::LLM_PROVIDER) {
            Ok(value) => value
                .parse::<LlmProvider>()
                .map_err(|message| LlmError::ConfigurationError { message })?,
            Err(_) => LlmProvider::Ollama,
        };

        let mut config = LlmConfig {
            provider,
            model: std::env::var(env_llm::LLM_MODEL).ok(),
            ..Default::default()
        };
        config.apply_env();

        Self::create(config)
    }

    /// List providers with their configuration status
    ///
    /// Returns a list of (provider, is_available, status_message) tuples.
    /// Ollama is probed over HTTP; remote providers only need a key.
    pub async fn list_available() -> Vec<(LlmProvider, bool, String)> {
        let mut result = Vec::new();

        let mut ollama = LlmConfig::ollama().with_timeout(5).with_max_retries(0);
        ollama.apply_env();
        let base_url = ollama.resolved_base_url();
        let status = match OllamaClient::new(ollama) {
            Ok(client) => match client.health_check().await {
                Ok(()) => (true, format!("Reachable at {base_url}")),
                Err(e) => (false, format!("{base_url}: {e}")),
            },
            Err(e) => (false, e.to_string()),
        };
        result.push((LlmProvider::Ollama, status.0, status.1));

        for (provider, key_var) in [
            (LlmProvider::OpenAi, env_apis::OPENAI_API_KEY),
            (LlmProvider::Xai, env_apis::XAI_API_KEY),
        ] {
            let configured = std::env::var(key_var).is_ok_and(|key| !key.trim().is_empty());
            result.push((
                provider,
                configured,
                if configured {
                    format!("Configured via {key_var}")
                } else {
                    format!("Missing {key_var}")
                },
            ));
        }

        result
    }
}
