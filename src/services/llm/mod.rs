//! LLM provider abstraction layer
//!
//! This module provides a unified chat-completion interface over:
//! - Ollama (local server, no key)
//! - OpenAI (remote, requires API key)
//! - xAI Grok (remote, OpenAI-compatible, requires API key)

pub mod adapters;
pub mod errors;
pub mod factory;
pub mod traits;
pub mod types;

pub use adapters::{OllamaClient, OpenAiCompatibleClient};
pub use errors::LlmError;
pub use factory::LlmClientFactory;
pub use traits::LlmClient;
pub use types::{
    ChatMessage, ChatRole, CompletionRequest, CompletionResponse, GenerationOptions, LlmConfig,
    LlmProvider, TokenUsage,
};

#[cfg(test)]
pub use traits::MockLlmClient;
