#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{exact_config, orchestrator, three_part_document, KeywordEmbedder, ScriptedLlm, VOCABULARY};
use docqa::error::DocQaError;
use docqa::models::DocumentStatus;
use docqa::services::embedding::{embed_in_batches, EmbeddingError, EmbeddingProvider};
use docqa::services::PipelineStage;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Earlier items take longer, so batches finish in reverse order
struct ReverseDelayEmbedder;

impl ReverseDelayEmbedder {
    fn number(text: &str) -> u64 {
        text.trim_start_matches("item-").parse().unwrap()
    }
}

#[async_trait]
impl EmbeddingProvider for ReverseDelayEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![Self::number(text) as f32, 1.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let first = Self::number(&texts[0]);
        tokio::time::sleep(Duration::from_millis((20 - first) * 10)).await;
        Ok(texts
            .iter()
            .map(|t| vec![Self::number(t) as f32, 1.0])
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "reverse-delay"
    }

    fn model_name(&self) -> String {
        "test".to_string()
    }

    async fn health_check(&self) -> Result<(), EmbeddingError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_batches_merge_in_input_order() {
    let texts: Vec<String> = (0..20).map(|n| format!("item-{n}")).collect();

    let vectors = embed_in_batches(&ReverseDelayEmbedder, &texts, 3, 4).await.unwrap();

    let order: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
    let expected: Vec<f32> = (0..20).map(|n| n as f32).collect();
    assert_eq!(order, expected);
}

#[tokio::test(start_paused = true)]
async fn test_sessions_run_in_parallel() {
    let llm = Arc::new(ScriptedLlm::replying("done").with_delay(Duration::from_millis(500)));
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = Arc::new(orchestrator(llm, embedder, exact_config()));

    let first = orchestrator.open_session(None).await.unwrap();
    let second = orchestrator.open_session(None).await.unwrap();

    let started = Instant::now();
    let (a, b) = tokio::join!(
        orchestrator.ask(&first, "one"),
        orchestrator.ask(&second, "two")
    );
    a.unwrap();
    b.unwrap();

    assert!(started.elapsed() < Duration::from_millis(900));
}

#[tokio::test(start_paused = true)]
async fn test_same_session_asks_are_serialized() {
    let llm = Arc::new(ScriptedLlm::replying("done").with_delay(Duration::from_millis(500)));
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = Arc::new(orchestrator(llm.clone(), embedder, exact_config()));
    let session = orchestrator.open_session(None).await.unwrap();

    let started = Instant::now();
    let handles: Vec<_> = ["one", "two"]
        .into_iter()
        .map(|question| {
            let orchestrator = orchestrator.clone();
            let session = session.clone();
            tokio::spawn(async move { orchestrator.ask(&session, question).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(started.elapsed() >= Duration::from_millis(1000));

    // The later ask saw the earlier exchange
    let sizes: Vec<usize> = llm.requests().iter().map(|r| r.messages.len()).collect();
    assert_eq!(sizes, vec![2, 4]);
    assert_eq!(orchestrator.history(&session).await.unwrap().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_generation() {
    let llm = Arc::new(ScriptedLlm::replying("too late").with_delay(Duration::from_secs(10)));
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = Arc::new(orchestrator(llm, embedder, exact_config()));
    orchestrator
        .ingest("handbook", &three_part_document())
        .await
        .unwrap();
    let session = orchestrator.open_session(Some("handbook")).await.unwrap();

    let cancel = CancellationToken::new();
    let task = {
        let orchestrator = orchestrator.clone();
        let session = session.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            orchestrator
                .ask_with_cancellation(&session, "What is X?", cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        orchestrator.session_stage(&session).await.unwrap(),
        PipelineStage::Generating
    );
    cancel.cancel();

    match task.await.unwrap() {
        Err(DocQaError::Cancelled { stage }) => assert_eq!(stage, "generating"),
        other => panic!("Expected cancellation, got {other:?}"),
    }
    assert!(orchestrator.history(&session).await.unwrap().is_empty());
    assert_eq!(
        orchestrator.session_stage(&session).await.unwrap(),
        PipelineStage::Idle
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_contextualizing() {
    let llm = Arc::new(
        ScriptedLlm::replying("Standalone question: What does X carry?")
            .with_delay(Duration::from_secs(1)),
    );
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = Arc::new(orchestrator(llm, embedder, exact_config()));
    orchestrator
        .ingest("handbook", &three_part_document())
        .await
        .unwrap();
    let session = orchestrator.open_session(Some("handbook")).await.unwrap();
    orchestrator.ask(&session, "What is X?").await.unwrap();

    let cancel = CancellationToken::new();
    let task = {
        let orchestrator = orchestrator.clone();
        let session = session.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            orchestrator
                .ask_with_cancellation(&session, "What does it carry?", cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        orchestrator.session_stage(&session).await.unwrap(),
        PipelineStage::Contextualizing
    );
    cancel.cancel();

    match task.await.unwrap() {
        Err(DocQaError::Cancelled { stage }) => assert_eq!(stage, "contextualizing"),
        other => panic!("Expected cancellation, got {other:?}"),
    }
    assert_eq!(orchestrator.history(&session).await.unwrap().len(), 2);
    assert_eq!(
        orchestrator.session_stage(&session).await.unwrap(),
        PipelineStage::Idle
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_retrieving() {
    let llm = Arc::new(ScriptedLlm::replying("never sent"));
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY).with_delay(Duration::from_secs(1)));
    let orchestrator = Arc::new(orchestrator(llm.clone(), embedder, exact_config()));
    orchestrator
        .ingest("handbook", &three_part_document())
        .await
        .unwrap();
    let session = orchestrator.open_session(Some("handbook")).await.unwrap();

    let cancel = CancellationToken::new();
    let task = {
        let orchestrator = orchestrator.clone();
        let session = session.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            orchestrator
                .ask_with_cancellation(&session, "What is X?", cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        orchestrator.session_stage(&session).await.unwrap(),
        PipelineStage::Retrieving
    );
    cancel.cancel();

    match task.await.unwrap() {
        Err(DocQaError::Cancelled { stage }) => assert_eq!(stage, "retrieving"),
        other => panic!("Expected cancellation, got {other:?}"),
    }
    assert!(orchestrator.history(&session).await.unwrap().is_empty());
    assert_eq!(
        orchestrator.session_stage(&session).await.unwrap(),
        PipelineStage::Idle
    );
    assert_eq!(llm.calls(), 0);
}

/// Slows down batches mentioning "legacy" and optionally fails them
struct LegacyAwareEmbedder {
    inner: KeywordEmbedder,
    fail_legacy: bool,
}

impl LegacyAwareEmbedder {
    fn new(fail_legacy: bool) -> Self {
        Self {
            inner: KeywordEmbedder::new(VOCABULARY),
            fail_legacy,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for LegacyAwareEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| t.contains("legacy")) {
            tokio::time::sleep(Duration::from_millis(500)).await;
            if self.fail_legacy {
                return Err(EmbeddingError::ProviderUnavailable {
                    message: "down".to_string(),
                });
            }
        }
        self.inner.embed_batch(texts).await
    }

    fn provider_name(&self) -> &'static str {
        "legacy-aware"
    }

    fn model_name(&self) -> String {
        "test".to_string()
    }

    async fn health_check(&self) -> Result<(), EmbeddingError> {
        Ok(())
    }
}

const LEGACY_TEXT: &str = "legacy notes: X used to be a storage protocol.";

#[tokio::test(start_paused = true)]
async fn test_older_failed_ingest_does_not_clobber_newer() {
    let orchestrator = orchestrator(
        Arc::new(ScriptedLlm::replying("ok [chunk 1]")),
        Arc::new(LegacyAwareEmbedder::new(true)),
        exact_config(),
    );
    let current = three_part_document();

    let (older, newer) = tokio::join!(orchestrator.ingest("handbook", LEGACY_TEXT), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        orchestrator.ingest("handbook", &current).await
    });

    assert!(older.is_err());
    assert_eq!(newer.unwrap().chunk_count, 3);
    assert_eq!(
        orchestrator.document_status("handbook").await,
        Some(DocumentStatus::Ready)
    );
    assert!(orchestrator.ingest("handbook", &current).await.unwrap().reused);

    let session = orchestrator.open_session(Some("handbook")).await.unwrap();
    assert!(orchestrator.ask(&session, "What is X?").await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_older_successful_ingest_does_not_replace_newer() {
    let orchestrator = orchestrator(
        Arc::new(ScriptedLlm::replying("ok")),
        Arc::new(LegacyAwareEmbedder::new(false)),
        exact_config(),
    );
    let current = three_part_document();

    let (older, newer) = tokio::join!(orchestrator.ingest("handbook", LEGACY_TEXT), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        orchestrator.ingest("handbook", &current).await
    });
    older.unwrap();
    newer.unwrap();

    // Only the newer content is cached
    assert!(orchestrator.ingest("handbook", &current).await.unwrap().reused);
    assert!(!orchestrator.ingest("handbook", LEGACY_TEXT).await.unwrap().reused);
}

#[tokio::test]
async fn test_documents_ingest_concurrently() {
    let llm = Arc::new(ScriptedLlm::replying("ok"));
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = Arc::new(orchestrator(llm, embedder, exact_config()));
    let text = three_part_document();

    let ingests: Vec<_> = ["first", "second"]
        .into_iter()
        .map(|document_id| {
            let orchestrator = orchestrator.clone();
            let text = text.clone();
            tokio::spawn(async move { orchestrator.ingest(document_id, &text).await })
        })
        .collect();
    for ingest in ingests {
        assert_eq!(ingest.await.unwrap().unwrap().chunk_count, 3);
    }

    let first = orchestrator.open_session(Some("first")).await.unwrap();
    let second = orchestrator.open_session(Some("second")).await.unwrap();
    let (a, b) = tokio::join!(
        orchestrator.ask(&first, "What is X?"),
        orchestrator.ask(&second, "What is Y?")
    );
    assert_eq!(a.unwrap().cited_chunks[0].document_id, "first");
    assert_eq!(b.unwrap().cited_chunks[0].document_id, "second");
}

#[tokio::test(start_paused = true)]
async fn test_evict_skips_session_with_ask_in_flight() {
    let llm = Arc::new(ScriptedLlm::replying("slow").with_delay(Duration::from_secs(5)));
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = Arc::new(orchestrator(llm, embedder, exact_config()));

    let idle = orchestrator.open_session(None).await.unwrap();
    let busy = orchestrator.open_session(None).await.unwrap();

    let task = {
        let orchestrator = orchestrator.clone();
        let busy = busy.clone();
        tokio::spawn(async move { orchestrator.ask(&busy, "hello").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(orchestrator.evict_idle_sessions(Duration::ZERO).await, 1);
    assert!(orchestrator.history(&idle).await.is_err());

    task.await.unwrap().unwrap();
    assert_eq!(orchestrator.history(&busy).await.unwrap().len(), 2);
}
