use serde::{Deserialize, Serialize};

use crate::env::{apis as env_apis, ollama as env_ollama};

/// Embedding backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProviderType {
    #[default]
    Ollama,
    OpenAi,
}

impl EmbeddingProviderType {
    pub fn default_model(&self) -> &'static str {
        match self {
            EmbeddingProviderType::Ollama => "llama3.2",
            EmbeddingProviderType::OpenAi => "text-embedding-ada-002",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            EmbeddingProviderType::Ollama => "http://localhost:11434",
            EmbeddingProviderType::OpenAi => "https://api.openai.com/v1",
        }
    }
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "ollama" | "local" => Ok(EmbeddingProviderType::Ollama),
            "openai" | "open-ai" => Ok(EmbeddingProviderType::OpenAi),
            _ => Err(format!(
                "Unknown embedding provider: {s}. Valid options: ollama, open-ai"
            )),
        }
    }
}

impl std::fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProviderType::Ollama => write!(f, "ollama"),
            EmbeddingProviderType::OpenAi => write!(f, "open-ai"),
        }
    }
}

/// Configuration for embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderType,
    pub model: Option<String>,
    pub base_url: Option<String>,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Ollama,
            model: None,
            base_url: None,
            api_key: None,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl EmbeddingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn openai(api_key: String) -> Self {
        Self {
            provider: EmbeddingProviderType::OpenAi,
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
            EmbeddingProviderType::Ollama => {
                if self.base_url.is_none() {
                    self.base_url = std::env::var(env_ollama::BASE_URL).ok();
                }
                if self.model.is_none() {
                    self.model = std::env::var(env_ollama::EMBED_MODEL).ok();
                }
            }
            EmbeddingProviderType::OpenAi => {
                if self.api_key.is_none() {
                    self.api_key = std::env::var(env_apis::OPENAI_API_KEY).ok();
                }
                if self.base_url.is_none() {
                    self.base_url = std::env::var(env_apis::OPENAI_BASE_URL).ok();
                }
            }
        }
    }
}
