use std::sync::Arc;

use crate::error::{DocQaError, Result};
use crate::models::ScoredChunk;
use crate::services::embedding::EmbeddingProvider;

use super::vector_index::VectorIndex;

pub const DEFAULT_TOP_K: usize = 4;

/// Embeds a query and searches one document's index
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(DocQaError::retrieval_embedding)?;

        let results = self
            .index
            .search(&vector, k)
            .map_err(DocQaError::retrieval_index)?;

        tracing::debug!(
            k,
            hits = results.len(),
            top_score = results.first().map(|r| r.score),
            "Retrieved chunks"
        );

        Ok(results)
    }
}
