use async_trait::async_trait;

use super::errors::EmbeddingError;

/// Turns text into fixed-dimension vectors
///
/// Implementations must return `embed_batch` results in input order, one
/// vector per input.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed many texts in one request
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> String;

    /// Check that the service answers and the model is usable
    async fn health_check(&self) -> Result<(), EmbeddingError>;
}
