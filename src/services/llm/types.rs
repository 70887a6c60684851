//! LLM types for multi-provider support
//!
//! This module provides provider-agnostic types for chat completions.

use serde::{Deserialize, Serialize};

use crate::env::{apis as env_apis, ollama as env_ollama};

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LlmProvider {
    /// Local Ollama server
    #[default]
    Ollama,
    /// OpenAI chat completions API
    OpenAi,
    /// xAI Grok through its OpenAI-compatible API
    Xai,
}

impl LlmProvider {
    pub fn all() -> &'static [LlmProvider] {
        &[LlmProvider::Ollama, LlmProvider::OpenAi, LlmProvider::Xai]
    }

    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "llama3.2",
            LlmProvider::OpenAi => "gpt-3.5-turbo",
            LlmProvider::Xai => "grok-2-latest",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "http://localhost:11434",
            LlmProvider::OpenAi => "https://api.openai.com/v1",
            LlmProvider::Xai => "https://api.x.ai/v1",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LlmProvider::Ollama)
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "ollama" | "local" => Ok(LlmProvider::Ollama),
            "openai" | "open-ai" | "gpt" => Ok(LlmProvider::OpenAi),
            "xai" | "x-ai" | "grok" => Ok(LlmProvider::Xai),
            _ => Err(format!(
                "Unknown LLM provider: {s}. Valid options: ollama, open-ai, xai"
            )),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::OpenAi => write!(f, "open-ai"),
            LlmProvider::Xai => write!(f, "xai"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request for a chat completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Ordered conversation, system message first
    pub messages: Vec<ChatMessage>,

    /// Sequences that end generation
    pub stop: Vec<String>,

    /// Temperature for sampling (optional, provider defaults apply)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate (optional, provider defaults apply)
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            stop: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Apply the sampling settings shared by every pipeline call
    pub fn with_options(self, options: &GenerationOptions) -> Self {
        self.with_temperature(options.temperature)
            .with_max_tokens(options.max_tokens)
            .with_stop(options.stop.clone())
    }

    /// Text of the last user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}

/// Response from a chat completion
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompletionResponse {
    /// The generated text content
    pub text: String,

    /// Token usage (if reported by provider)
    pub token_usage: Option<TokenUsage>,

    /// Model used for generation
    pub model_used: Option<String>,

    /// Reason for stopping generation
    pub finish_reason: Option<String>,
}

impl CompletionResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Sampling settings applied to every completion the pipeline requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 512,
            stop: vec!["<|im_end|>".to_string()],
        }
    }
}

/// Configuration for LLM client creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: Option<String>,
    pub base_url: Option<String>,

    /// API key for remote providers; never written back to disk
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub timeout_secs: u64,
    pub max_retries: usize,

    #[serde(flatten)]
    pub generation: GenerationOptions,

    /// Ollama-only sampling knobs
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub repeat_penalty: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            model: None,
            base_url: None,
            api_key: None,
            timeout_secs: 120,
            max_retries: 2,
            generation: GenerationOptions::default(),
            top_k: Some(40),
            top_p: Some(0.9),
            repeat_penalty: Some(1.1),
        }
    }
}

impl LlmConfig {
    pub fn ollama() -> Self {
        Self::default()
    }

    pub fn openai(api_key: String) -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            api_key: Some(api_key),
            ..Default::default()
        }
    }

    pub fn xai(api_key: String) -> Self {
        Self {
            provider: LlmProvider::Xai,
            api_key: Some(api_key),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Fill provider-specific fields left unset from the environment
    pub fn apply_env(&mut self) {
        match self.provider {
            LlmProvider::Ollama => {
                if self.base_url.is_none() {
                    self.base_url = std::env::var(env_ollama::BASE_URL).ok();
                }
                if self.model.is_none() {
                    self.model = std::env::var(env_ollama::CHAT_MODEL).ok();
                }
            }
            LlmProvider::OpenAi => {
                if self.api_key.is_none() {
                    self.api_key = std::env::var(env_apis::OPENAI_API_KEY).ok();
                }
                if self.base_url.is_none() {
                    self.base_url = std::env::var(env_apis::OPENAI_BASE_URL).ok();
                }
            }
            LlmProvider::Xai => {
                if self.api_key.is_none() {
                    self.api_key = std::env::var(env_apis::XAI_API_KEY).ok();
                }
            }
        }
    }
}
