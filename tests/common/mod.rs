//! Deterministic in-process providers for pipeline tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docqa::config::RagConfig;
use docqa::services::embedding::{EmbeddingError, EmbeddingProvider};
use docqa::services::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use docqa::services::ConversationalRagOrchestrator;

/// Bag-of-words embedder over a fixed vocabulary
///
/// Texts sharing no vocabulary word get orthogonal (or zero) vectors.
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
    calls: AtomicUsize,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_lowercase()).collect(),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay: None,
        }
    }

    pub fn failing(vocabulary: &[&str]) -> Self {
        let embedder = Self::new(vocabulary);
        embedder.set_failing(true);
        embedder
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        self.vocabulary
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count() as f32)
            .collect()
    }

    async fn call(&self) -> Result<(), EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::ProviderUnavailable {
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.call().await?;
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.call().await?;
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn provider_name(&self) -> &'static str {
        "keyword"
    }

    fn model_name(&self) -> String {
        format!("bag-of-{}", self.vocabulary.len())
    }

    async fn health_check(&self) -> Result<(), EmbeddingError> {
        Ok(())
    }
}

type Script = dyn Fn(&CompletionRequest) -> Result<CompletionResponse, LlmError> + Send + Sync;

/// Chat model whose replies come from a closure; every request is recorded
pub struct ScriptedLlm {
    script: Box<Script>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedLlm {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<CompletionResponse, LlmError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Always replies with `text`
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(CompletionResponse::new(text.clone())))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(&request)
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn model_name(&self) -> String {
        "scripted".to_string()
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}

pub const VOCABULARY: &[&str] = &["x", "y", "protocol", "storage", "relate", "weather"];

/// 240 characters split into exactly three chunks by `exact_config`:
/// `[0,100)`, `[80,180)` and `[160,240)`. Only the middle chunk mentions X
/// and only the last one mentions Y.
pub fn three_part_document() -> String {
    let intro = format!("{:<100}", "This handbook was written on a rainy afternoon by the operations team.");
    let x_part = format!("{:<60}", "X is a messaging protocol for devices.");
    let gap = format!("{:<20}", "See also:");
    let y_part = format!("{:<60}", "Y is a storage layer for long-term data.");
    let text = format!("{intro}{x_part}{gap}{y_part}");
    assert_eq!(text.chars().count(), 240);
    text
}

pub fn exact_config() -> RagConfig {
    RagConfig {
        chunk_size: 100,
        chunk_overlap: 20,
        snap_to_boundaries: false,
        top_k: 4,
        max_turns: 4,
        embedding_batch_size: 2,
        embedding_concurrency: 2,
        ..Default::default()
    }
}

pub fn orchestrator(
    llm: Arc<ScriptedLlm>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RagConfig,
) -> ConversationalRagOrchestrator {
    ConversationalRagOrchestrator::new(llm, embedder, config).unwrap()
}

/// Text of the passage labelled `[chunk N]` in an answer prompt
pub fn passage(request: &CompletionRequest, label: usize) -> Option<String> {
    let system = &request.messages.first()?.content;
    let marker = format!("[chunk {label}]\n");
    let start = system.find(&marker)? + marker.len();
    let rest = &system[start..];
    let end = rest
        .find("\n\n[chunk ")
        .or_else(|| rest.find("\n</context>"))
        .unwrap_or(rest.len());
    Some(rest[..end].to_string())
}
