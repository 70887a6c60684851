#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{exact_config, orchestrator, passage, three_part_document, KeywordEmbedder, ScriptedLlm, VOCABULARY};
use docqa::models::TurnRole;
use docqa::services::llm::{ChatRole, CompletionResponse};
use docqa::services::rag::prompts::CONTEXTUALIZE_SYSTEM_PROMPT;
use docqa::services::rag::NOT_FOUND_MARKER;
use docqa::services::PipelineStage;

/// Rewrites "it" follow-ups and answers from the most relevant passage
fn document_llm() -> ScriptedLlm {
    ScriptedLlm::new(|request| {
        if request.messages[0].content == CONTEXTUALIZE_SYSTEM_PROMPT {
            let question = request.last_user_message().unwrap_or_default();
            return Ok(CompletionResponse::new(format!(
                "Standalone question: {}",
                question.replace(" it ", " X ")
            )));
        }

        let top = passage(request, 1).unwrap_or_default();
        match passage(request, 2) {
            Some(second) if request.messages.len() > 2 => Ok(CompletionResponse::new(format!(
                "{} [chunk 1] {} [chunk 2]",
                top.trim(),
                second.trim()
            ))),
            _ => Ok(CompletionResponse::new(format!("{} [chunk 1]", top.trim()))),
        }
    })
}

#[tokio::test]
async fn test_follow_up_is_rewritten_and_grounded() {
    let llm = Arc::new(document_llm());
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = orchestrator(llm.clone(), embedder.clone(), exact_config());

    let report = orchestrator
        .ingest("handbook", &three_part_document())
        .await
        .unwrap();
    assert_eq!(report.chunk_count, 3);
    assert_eq!(report.dimension, VOCABULARY.len());

    let session = orchestrator.open_session(Some("handbook")).await.unwrap();

    // First question: nothing to rewrite, so only the answer call is made
    let first = orchestrator.ask(&session, "What is X?").await.unwrap();
    assert_eq!(llm.calls(), 1);
    assert_eq!(first.standalone_question, "What is X?");
    assert!(first.grounded);
    assert_eq!(first.cited_chunks.len(), 1);
    assert_eq!(first.cited_chunks[0].index, 1);
    assert!(first.answer.contains("X is a messaging protocol"));

    // Follow-up depends on the first exchange
    let second = orchestrator
        .ask(&session, "How does it relate to Y?")
        .await
        .unwrap();
    assert_eq!(llm.calls(), 3);
    assert_eq!(second.standalone_question, "How does X relate to Y?");
    assert!(second.warnings.is_empty());

    let top_two: Vec<usize> = second.retrieved.iter().take(2).map(|r| r.chunk.index).collect();
    assert!(top_two.contains(&1));
    assert!(top_two.contains(&2));
    assert!(second.retrieved[0].score > 0.0 && second.retrieved[1].score > 0.0);

    let cited: Vec<usize> = second.cited_chunks.iter().map(|c| c.index).collect();
    assert_eq!(cited.len(), 2);

    // Generation saw the earlier exchange between the system prompt and the question
    let answer_request = llm.requests().pop().unwrap();
    let roles: Vec<ChatRole> = answer_request.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
    );
    assert_eq!(answer_request.messages[1].content, "What is X?");

    let history = orchestrator.history(&session).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].content, "What is X?");
    assert_eq!(history[2].content, "How does it relate to Y?");
    assert_eq!(history[3].role, TurnRole::Assistant);
    assert_eq!(
        orchestrator.session_stage(&session).await.unwrap(),
        PipelineStage::Idle
    );
}

#[tokio::test]
async fn test_history_keeps_latest_pairs() {
    let llm = Arc::new(ScriptedLlm::replying("Noted."));
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = orchestrator(llm, embedder, exact_config());

    let session = orchestrator.open_session(None).await.unwrap();
    for question in ["one", "two", "three"] {
        orchestrator.ask(&session, question).await.unwrap();
    }

    let history = orchestrator.history(&session).await.unwrap();
    let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["two", "Noted.", "three", "Noted."]);
}

#[tokio::test]
async fn test_irrelevant_question_returns_marker() {
    let llm = Arc::new(ScriptedLlm::replying("should not be called"));
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let config = docqa::config::RagConfig {
        min_relevance: Some(0.3),
        ..exact_config()
    };
    let orchestrator = orchestrator(llm.clone(), embedder, config);
    orchestrator
        .ingest("handbook", &three_part_document())
        .await
        .unwrap();

    let session = orchestrator.open_session(Some("handbook")).await.unwrap();
    let response = orchestrator
        .ask(&session, "Who won the 1998 final?")
        .await
        .unwrap();

    assert_eq!(response.answer, NOT_FOUND_MARKER);
    assert!(response.cited_chunks.is_empty());
    assert!(!response.grounded);
    assert_eq!(llm.calls(), 0);
    assert_eq!(orchestrator.history(&session).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_model_not_found_reply_cites_nothing() {
    let llm = Arc::new(ScriptedLlm::replying(NOT_FOUND_MARKER));
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = orchestrator(llm.clone(), embedder, exact_config());
    orchestrator
        .ingest("handbook", &three_part_document())
        .await
        .unwrap();

    let session = orchestrator.open_session(Some("handbook")).await.unwrap();
    let response = orchestrator.ask(&session, "What is X?").await.unwrap();

    assert_eq!(response.answer, NOT_FOUND_MARKER);
    assert!(response.cited_chunks.is_empty());
    assert!(llm.requests()[0].messages[0].content.contains(NOT_FOUND_MARKER));
}

#[tokio::test]
async fn test_reset_clears_history_and_skips_rewrite() {
    let llm = Arc::new(document_llm());
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = orchestrator(llm.clone(), embedder, exact_config());
    orchestrator
        .ingest("handbook", &three_part_document())
        .await
        .unwrap();
    let session = orchestrator.open_session(Some("handbook")).await.unwrap();

    orchestrator.ask(&session, "What is X?").await.unwrap();
    orchestrator.reset_session(&session).await.unwrap();
    assert!(orchestrator.history(&session).await.unwrap().is_empty());

    let response = orchestrator.ask(&session, "What is Y?").await.unwrap();
    assert_eq!(response.standalone_question, "What is Y?");
    assert_eq!(llm.calls(), 2);
    assert_eq!(response.cited_chunks[0].index, 2);
}

#[tokio::test]
async fn test_general_chat_uses_history() {
    let llm = Arc::new(ScriptedLlm::new(|request| {
        Ok(CompletionResponse::new(format!(
            "You have said {} things",
            request
                .messages
                .iter()
                .filter(|m| m.role == ChatRole::User)
                .count()
        )))
    }));
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = orchestrator(llm, embedder.clone(), exact_config());

    let session = orchestrator.open_session(None).await.unwrap();
    orchestrator.ask(&session, "hi").await.unwrap();
    let second = orchestrator.ask(&session, "hello again").await.unwrap();

    assert_eq!(second.answer, "You have said 2 things");
    assert_eq!(second.standalone_question, "hello again");
    assert!(second.retrieved.is_empty());
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_reingest_same_text_reuses_index() {
    let llm = Arc::new(ScriptedLlm::replying("ok"));
    let embedder = Arc::new(KeywordEmbedder::new(VOCABULARY));
    let orchestrator = orchestrator(llm, embedder.clone(), exact_config());
    let text = three_part_document();

    orchestrator.ingest("handbook", &text).await.unwrap();
    let calls_after_first = embedder.calls();
    let again = orchestrator.ingest("handbook", &text).await.unwrap();

    assert!(again.reused);
    assert_eq!(embedder.calls(), calls_after_first);

    let changed = orchestrator
        .ingest("handbook", &text.replace("rainy", "sunny"))
        .await
        .unwrap();
    assert!(!changed.reused);
    assert!(embedder.calls() > calls_after_first);
}
