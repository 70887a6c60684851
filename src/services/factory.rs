//! Composition root for the external providers

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{DocQaError, Result};

use super::embedding::{create_embedder, EmbeddingProvider};
use super::llm::{LlmClient, LlmClientFactory};

pub struct ProviderFactory;

impl ProviderFactory {
    /// Build the chat and embedding providers named in `config`
    ///
    /// Both are resolved before either is returned, and all problems are
    /// reported together in one `InvalidConfig` error.
    pub fn from_config(config: &AppConfig) -> Result<(Arc<dyn LlmClient>, Arc<dyn EmbeddingProvider>)> {
        let llm = LlmClientFactory::create(config.llm.clone());
        let embedder = create_embedder(&config.embedding);

        match (llm, embedder) {
            (Ok(llm), Ok(embedder)) => {
                tracing::info!(
                    llm_provider = llm.provider_name(),
                    llm_model = %llm.model_name(),
                    embedding_provider = embedder.provider_name(),
                    embedding_model = %embedder.model_name(),
                    "Providers ready"
                );
                Ok((llm, embedder))
            }
            (llm, embedder) => {
                let problems: Vec<String> = [
                    llm.err().map(|e| format!("llm ({}): {e}", config.llm.provider)),
                    embedder
                        .err()
                        .map(|e| format!("embedding ({}): {e}", config.embedding.provider)),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(DocQaError::invalid_config(problems.join("; ")))
            }
        }
    }
}
