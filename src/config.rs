//! Configuration file management for docqa
//!
//! Settings are read from `~/.docqa/config.toml` (or an explicit path) and
//! then overridden by environment variables. Missing files fall back to
//! defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::env::{config as env_config, embedding as env_embedding, llm as env_llm, rag as env_rag};
use crate::error::{DocQaError, Result};
use crate::services::embedding::{EmbeddingConfig, EmbeddingProviderType};
use crate::services::llm::{LlmConfig, LlmProvider};

/// Retrieval pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Characters per chunk
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
    /// Move chunk ends back to paragraph, sentence or word boundaries
    pub snap_to_boundaries: bool,
    /// Chunks retrieved per question
    pub top_k: usize,
    /// Turns kept per session (even)
    pub max_turns: usize,
    /// Chunks scoring below this are not shown to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_relevance: Option<f32>,
    pub embedding_batch_size: usize,
    pub embedding_concurrency: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            snap_to_boundaries: true,
            top_k: 4,
            max_turns: 4,
            min_relevance: None,
            embedding_batch_size: 16,
            embedding_concurrency: num_cpus::get().clamp(1, 4),
        }
    }
}

impl RagConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DocQaError::invalid_config("rag.chunk_size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(DocQaError::invalid_config(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(DocQaError::invalid_config("rag.top_k must be positive"));
        }
        if self.max_turns < 2 || self.max_turns % 2 != 0 {
            return Err(DocQaError::invalid_config(format!(
                "rag.max_turns must be an even number of at least 2, got {}",
                self.max_turns
            )));
        }
        if let Some(threshold) = self.min_relevance {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(DocQaError::invalid_config(
                    "rag.min_relevance must lie between -1.0 and 1.0",
                ));
            }
        }
        if self.embedding_batch_size == 0 || self.embedding_concurrency == 0 {
            return Err(DocQaError::invalid_config(
                "rag.embedding_batch_size and rag.embedding_concurrency must be positive",
            ));
        }
        Ok(())
    }
}

/// Configuration structure matching config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
}

impl AppConfig {
    /// Get the default config file path (~/.docqa/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| DocQaError::invalid_config("Could not find home directory"))?;
        Ok(home_dir.join(".docqa").join("config.toml"))
    }

    /// Load configuration, apply environment overrides and validate
    ///
    /// Path priority: `path` argument, then `DOCQA_CONFIG`, then the default
    /// location. An explicitly named file must exist; the default one may not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(env_config::CONFIG_FILE).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_path() {
                Ok(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Environment variables win over file values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(provider) = env_value::<LlmProvider>(env_llm::LLM_PROVIDER)? {
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var(env_llm::LLM_MODEL) {
            self.llm.model = Some(model);
        }
        if let Some(timeout) = env_value::<u64>(env_llm::LLM_TIMEOUT)? {
            self.llm.timeout_secs = timeout;
        }
        if let Some(provider) = env_value::<EmbeddingProviderType>(env_embedding::EMBEDDING_PROVIDER)? {
            self.embedding.provider = provider;
        }
        if let Ok(model) = std::env::var(env_embedding::EMBEDDING_MODEL) {
            self.embedding.model = Some(model);
        }
        if let Some(size) = env_value::<usize>(env_rag::CHUNK_SIZE)? {
            self.rag.chunk_size = size;
        }
        if let Some(overlap) = env_value::<usize>(env_rag::CHUNK_OVERLAP)? {
            self.rag.chunk_overlap = overlap;
        }
        if let Some(top_k) = env_value::<usize>(env_rag::TOP_K)? {
            self.rag.top_k = top_k;
        }
        if let Some(max_turns) = env_value::<usize>(env_rag::MAX_TURNS)? {
            self.rag.max_turns = max_turns;
        }

        self.llm.apply_env();
        self.embedding.apply_env();
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.rag.validate()?;

        let generation = &self.llm.generation;
        if generation.max_tokens == 0 {
            return Err(DocQaError::invalid_config("llm.max_tokens must be positive"));
        }
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(DocQaError::invalid_config(
                "llm.temperature must lie between 0.0 and 2.0",
            ));
        }
        if self.llm.timeout_secs == 0 || self.embedding.timeout_secs == 0 {
            return Err(DocQaError::invalid_config("timeouts must be positive"));
        }
        Ok(())
    }

    /// Write configuration to `path`; API keys are never written
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            DocQaError::invalid_config(format!("Failed to serialize config: {e}"))
        })?;
        fs::write(path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Effective settings as TOML, with API keys masked
    pub fn to_display_toml(&self) -> Result<String> {
        let mut text = toml::to_string_pretty(self).map_err(|e| {
            DocQaError::invalid_config(format!("Failed to serialize config: {e}"))
        })?;
        for (section, key) in [("llm", &self.llm.api_key), ("embedding", &self.embedding.api_key)] {
            if let Some(key) = key {
                text.push_str(&format!("\n# {section}.api_key = \"{}\"\n", mask_api_key(key)));
            }
        }
        Ok(text)
    }
}

fn env_value<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| DocQaError::invalid_config(format!("{name}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Mask API key for display (show first 4 and last 4 characters)
fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
