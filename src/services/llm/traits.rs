//! LLM client trait definition
//!
//! This module defines the core trait that all chat providers must implement.

use super::errors::LlmError;
use super::types::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;

/// Provider-agnostic trait for chat completions
///
/// The pipeline talks to Ollama, OpenAI and xAI only through this trait, so
/// tests substitute scripted implementations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a conversation
    ///
    /// # Arguments
    /// * `request` - Ordered messages plus sampling parameters
    ///
    /// # Returns
    /// * `Ok(CompletionResponse)` - The generated text with metadata
    /// * `Err(LlmError)` - Provider-specific or transport errors
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Get the provider name for logging and debugging
    fn provider_name(&self) -> &'static str;

    /// Get the model identifier being used
    fn model_name(&self) -> String;

    /// Check if the provider is reachable and the model is available
    async fn health_check(&self) -> Result<(), LlmError>;
}
