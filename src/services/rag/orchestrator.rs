//! Conversational retrieval pipeline
//!
//! Each `ask` runs Contextualizing, Retrieving and Generating against a
//! snapshot of the session history while holding that session's lock. The
//! session is written exactly once, after the answer exists, so a failed or
//! cancelled ask leaves history untouched.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::RagConfig;
use crate::error::{DocQaError, Result};
use crate::logging::log_performance;
use crate::models::{content_hash, Chunk, ConversationTurn, DocumentStatus, ScoredChunk};
use crate::services::embedding::{embed_in_batches, EmbeddingError, EmbeddingProvider};
use crate::services::llm::{GenerationOptions, LlmClient};

use super::chunker::{ChunkerConfig, DocumentChunker};
use super::contextualizer::QueryContextualizer;
use super::documents::DocumentRegistry;
use super::generator::AnswerGenerator;
use super::memory::{PipelineStage, SessionStore, StageGuard};
use super::retriever::Retriever;
use super::vector_index::VectorIndex;

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
    pub dimension: usize,
    /// True when an index built from identical text was reused
    pub reused: bool,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct AskResponse {
    pub answer: String,
    pub cited_chunks: Vec<Chunk>,
    /// Query actually used for retrieval
    pub standalone_question: String,
    pub retrieved: Vec<ScoredChunk>,
    /// Non-fatal problems, such as a failed rewrite
    pub warnings: Vec<DocQaError>,
    pub grounded: bool,
}

pub struct ConversationalRagOrchestrator {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: DocumentChunker,
    contextualizer: QueryContextualizer,
    generator: AnswerGenerator,
    documents: DocumentRegistry,
    sessions: SessionStore,
    llm: Arc<dyn LlmClient>,
    config: RagConfig,
}

impl ConversationalRagOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RagConfig,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = DocumentChunker::new(ChunkerConfig {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            snap_to_boundaries: config.snap_to_boundaries,
        })?;
        let options = GenerationOptions::default();

        Ok(Self {
            contextualizer: QueryContextualizer::new(llm.clone(), options.clone()),
            generator: AnswerGenerator::new(llm.clone(), options)
                .with_min_relevance(config.min_relevance),
            embedder,
            chunker,
            documents: DocumentRegistry::new(),
            sessions: SessionStore::new(config.max_turns),
            llm,
            config,
        })
    }

    /// Replace the sampling settings used for every LLM call
    pub fn with_generation_options(mut self, options: GenerationOptions) -> Self {
        self.contextualizer = QueryContextualizer::new(self.llm.clone(), options.clone());
        self.generator = AnswerGenerator::new(self.llm.clone(), options)
            .with_min_relevance(self.config.min_relevance);
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Chunk, embed and index `text` as `document_id`
    ///
    /// On failure the document is marked failed and asks against it return
    /// `DocumentNotReady` until it is ingested successfully.
    pub async fn ingest(&self, document_id: &str, text: &str) -> Result<IngestReport> {
        let started = Instant::now();
        let hash = content_hash(text);

        if let Some(index) = self.documents.cached_index(document_id, &hash).await {
            tracing::info!(document_id, chunks = index.len(), "Reusing cached index");
            return Ok(IngestReport {
                document_id: document_id.to_string(),
                chunk_count: index.len(),
                dimension: index.dimension(),
                reused: true,
                elapsed: started.elapsed(),
            });
        }

        let generation = self.documents.mark_indexing(document_id, &hash).await;

        match self.build_index(document_id, text).await {
            Ok(index) => {
                let report = IngestReport {
                    document_id: document_id.to_string(),
                    chunk_count: index.len(),
                    dimension: index.dimension(),
                    reused: false,
                    elapsed: started.elapsed(),
                };
                if self
                    .documents
                    .mark_ready(document_id, generation, Arc::new(index))
                    .await
                {
                    tracing::info!(
                        document_id,
                        chunks = report.chunk_count,
                        dimension = report.dimension,
                        "Document indexed"
                    );
                } else {
                    tracing::debug!(document_id, generation, "Discarded index from superseded ingest");
                }
                log_performance("ingest", report.elapsed.as_millis() as u64, true);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(document_id, error = %e, "Ingestion failed");
                self.documents
                    .mark_failed(document_id, generation, e.to_string())
                    .await;
                log_performance("ingest", started.elapsed().as_millis() as u64, false);
                Err(e)
            }
        }
    }

    async fn build_index(&self, document_id: &str, text: &str) -> Result<VectorIndex> {
        let chunks = self.chunker.chunk(document_id, text);
        if chunks.is_empty() {
            return Err(DocQaError::chunking("no extractable content"));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_in_batches(
            self.embedder.as_ref(),
            &texts,
            self.config.embedding_batch_size,
            self.config.embedding_concurrency,
        )
        .await?;

        let dimension = vectors.first().map(Vec::len).unwrap_or_default();
        if dimension == 0 {
            return Err(EmbeddingError::ParseError {
                message: "provider returned empty vectors".to_string(),
            }
            .into());
        }

        let mut index = VectorIndex::new(dimension);
        index
            .add(chunks, vectors)
            .map_err(DocQaError::retrieval_index)?;
        Ok(index)
    }

    pub async fn document_status(&self, document_id: &str) -> Option<DocumentStatus> {
        self.documents.status(document_id).await
    }

    /// Start a conversation, optionally bound to an ingested document
    ///
    /// Without a document the session is plain chat with no retrieval.
    pub async fn open_session(&self, document_id: Option<&str>) -> Result<String> {
        self.ensure_known(document_id).await?;
        let id = self.sessions.open(document_id.map(str::to_string)).await;
        tracing::debug!(session_id = %id, document_id, "Opened session");
        Ok(id)
    }

    /// Open or reuse a session under a caller-chosen id
    pub async fn open_session_with_id(&self, session_id: &str, document_id: Option<&str>) -> Result<()> {
        self.ensure_known(document_id).await?;
        self.sessions
            .open_with_id(session_id, document_id.map(str::to_string))
            .await;
        Ok(())
    }

    async fn ensure_known(&self, document_id: Option<&str>) -> Result<()> {
        match document_id {
            Some(id) if self.documents.status(id).await.is_none() => {
                Err(DocQaError::document_not_found(id))
            }
            _ => Ok(()),
        }
    }

    pub async fn ask(&self, session_id: &str, question: &str) -> Result<AskResponse> {
        self.ask_with_cancellation(session_id, question, CancellationToken::new())
            .await
    }

    /// Answer one question within a session
    ///
    /// Asks on the same session run one at a time. Cancelling `cancel` stops
    /// the pipeline at the next stage boundary or mid-call and leaves the
    /// history as it was.
    pub async fn ask_with_cancellation(
        &self,
        session_id: &str,
        question: &str,
        cancel: CancellationToken,
    ) -> Result<AskResponse> {
        let started = Instant::now();
        let slot = self.sessions.get(session_id).await?;

        let mut session = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DocQaError::cancelled("waiting for session")),
            session = slot.lock() => session,
        };

        let guard = slot.enter();
        let history = session.history();
        let document_id = session.document_id.clone();

        let result = self
            .run_pipeline(&guard, document_id.as_deref(), &history, question, &cancel)
            .await;

        match result {
            Ok(response) => {
                session.append_exchange(question, response.answer.clone());
                tracing::info!(
                    session_id,
                    grounded = response.grounded,
                    cited = response.cited_chunks.len(),
                    warnings = response.warnings.len(),
                    history = session.len(),
                    "Answered question"
                );
                log_performance("ask", started.elapsed().as_millis() as u64, true);
                Ok(response)
            }
            Err(e) => {
                guard.fail(&e);
                tracing::warn!(session_id, category = e.category(), error = %e, "Ask failed");
                log_performance("ask", started.elapsed().as_millis() as u64, false);
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        guard: &StageGuard<'_>,
        document_id: Option<&str>,
        history: &[ConversationTurn],
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<AskResponse> {
        let Some(document_id) = document_id else {
            guard.advance(PipelineStage::Generating);
            let answer = cancellable(
                cancel,
                PipelineStage::Generating,
                self.generator.answer_without_context(question, history),
            )
            .await??;

            return Ok(AskResponse {
                answer: answer.text,
                cited_chunks: Vec::new(),
                standalone_question: question.to_string(),
                retrieved: Vec::new(),
                warnings: Vec::new(),
                grounded: false,
            });
        };

        let index = self.documents.ready_index(document_id).await?;

        guard.advance(PipelineStage::Contextualizing);
        let contextualized = cancellable(
            cancel,
            PipelineStage::Contextualizing,
            self.contextualizer.contextualize(history, question),
        )
        .await?;
        let standalone = contextualized.question;

        guard.advance(PipelineStage::Retrieving);
        let retriever = Retriever::new(self.embedder.clone(), index);
        let retrieved = cancellable(
            cancel,
            PipelineStage::Retrieving,
            retriever.retrieve(&standalone, self.config.top_k),
        )
        .await??;

        guard.advance(PipelineStage::Generating);
        let answer = cancellable(
            cancel,
            PipelineStage::Generating,
            self.generator.generate(&standalone, &retrieved, history),
        )
        .await??;

        Ok(AskResponse {
            answer: answer.text,
            cited_chunks: answer.cited_chunks,
            standalone_question: standalone,
            retrieved,
            warnings: contextualized.warning.into_iter().collect(),
            grounded: answer.grounded,
        })
    }

    /// Turns of a session, oldest first
    pub async fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let slot = self.sessions.get(session_id).await?;
        let session = slot.lock().await;
        Ok(session.history())
    }

    /// Forget a session's turns but keep the session
    pub async fn reset_session(&self, session_id: &str) -> Result<()> {
        let slot = self.sessions.get(session_id).await?;
        slot.lock().await.clear();
        tracing::debug!(session_id, "Reset session");
        Ok(())
    }

    pub async fn close_session(&self, session_id: &str) -> Result<()> {
        if self.sessions.remove(session_id).await {
            Ok(())
        } else {
            Err(DocQaError::session_not_found(session_id))
        }
    }

    pub async fn evict_idle_sessions(&self, max_idle: Duration) -> usize {
        self.sessions.evict_idle(max_idle).await
    }

    pub async fn session_stage(&self, session_id: &str) -> Result<PipelineStage> {
        Ok(self.sessions.get(session_id).await?.stage())
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    stage: PipelineStage,
    work: impl Future<Output = T>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DocQaError::cancelled(stage.to_string())),
        value = work => Ok(value),
    }
}
