//! Embedding providers for chunk and query vectors
//!
//! - Ollama (`/api/embed`, local)
//! - OpenAI-compatible (`/embeddings`, requires API key)

pub mod batch;
pub mod config;
pub mod errors;
pub mod ollama;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use batch::embed_in_batches;
pub use config::{EmbeddingConfig, EmbeddingProviderType};
pub use errors::EmbeddingError;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::EmbeddingProvider;

#[cfg(test)]
pub use traits::MockEmbeddingProvider;

/// Build the provider selected by `config`
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match config.provider {
        EmbeddingProviderType::Ollama => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        EmbeddingProviderType::OpenAi => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
    }
}
