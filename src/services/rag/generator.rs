use std::collections::BTreeSet;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{DocQaError, Result};
use crate::models::{Chunk, ConversationTurn, ScoredChunk};
use crate::services::llm::{CompletionRequest, GenerationOptions, LlmClient, LlmError};

use super::prompts::{self, NOT_FOUND_MARKER};

lazy_static! {
    static ref CITATION: Regex =
        Regex::new(r"(?i)\[chunk\s+(\d+)\]").expect("citation pattern is valid");
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    pub text: String,
    pub cited_chunks: Vec<Chunk>,
    /// False for not-found answers and general chat
    pub grounded: bool,
}

impl GeneratedAnswer {
    pub fn not_found() -> Self {
        Self {
            text: NOT_FOUND_MARKER.to_string(),
            cited_chunks: Vec::new(),
            grounded: false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.text == NOT_FOUND_MARKER
    }
}

/// Produces answers restricted to retrieved chunks
pub struct AnswerGenerator {
    llm: Arc<dyn LlmClient>,
    options: GenerationOptions,
    min_relevance: Option<f32>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, options: GenerationOptions) -> Self {
        Self {
            llm,
            options,
            min_relevance: None,
        }
    }

    pub fn with_min_relevance(mut self, threshold: Option<f32>) -> Self {
        self.min_relevance = threshold;
        self
    }

    /// Answer `question` from `chunks`, most relevant first
    pub async fn generate(
        &self,
        question: &str,
        chunks: &[ScoredChunk],
        history: &[ConversationTurn],
    ) -> Result<GeneratedAnswer> {
        let relevant: Vec<ScoredChunk> = match self.min_relevance {
            Some(threshold) => chunks
                .iter()
                .filter(|c| c.score >= threshold)
                .cloned()
                .collect(),
            None => chunks.to_vec(),
        };

        if relevant.is_empty() {
            tracing::info!(
                supplied = chunks.len(),
                min_relevance = self.min_relevance,
                "No relevant chunks, answering not found"
            );
            return Ok(GeneratedAnswer::not_found());
        }

        let request = CompletionRequest::new(prompts::answer_messages(question, &relevant, history))
            .with_options(&self.options);
        let text = self.complete(request).await?;

        if text.contains(NOT_FOUND_MARKER) {
            return Ok(GeneratedAnswer::not_found());
        }

        let cited_chunks = cited(&text, &relevant);
        tracing::debug!(
            chunks = relevant.len(),
            cited = cited_chunks.len(),
            "Generated grounded answer"
        );

        Ok(GeneratedAnswer {
            text,
            cited_chunks,
            grounded: true,
        })
    }

    /// Plain assistant reply for sessions with no document
    pub async fn answer_without_context(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<GeneratedAnswer> {
        let request = CompletionRequest::new(prompts::general_messages(history, question))
            .with_options(&self.options);
        let text = self.complete(request).await?;

        Ok(GeneratedAnswer {
            text,
            cited_chunks: Vec::new(),
            grounded: false,
        })
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let response = self
            .llm
            .complete(request)
            .await
            .map_err(DocQaError::Generation)?;

        let text = response.text.trim();
        if text.is_empty() {
            return Err(DocQaError::Generation(LlmError::InvalidResponse {
                message: "model returned an empty answer".to_string(),
            }));
        }
        Ok(text.to_string())
    }
}

/// Chunks whose labels appear in `answer`; all of them when none do
fn cited(answer: &str, chunks: &[ScoredChunk]) -> Vec<Chunk> {
    let positions: BTreeSet<usize> = CITATION
        .captures_iter(answer)
        .filter_map(|caps| caps[1].parse::<usize>().ok())
        .filter(|&label| label >= 1 && label <= chunks.len())
        .map(|label| label - 1)
        .collect();

    if positions.is_empty() {
        return chunks.iter().map(|c| c.chunk.clone()).collect();
    }
    positions.into_iter().map(|p| chunks[p].chunk.clone()).collect()
}
