use std::sync::Arc;

use crate::error::DocQaError;
use crate::models::ConversationTurn;
use crate::services::llm::{CompletionRequest, GenerationOptions, LlmClient};

use super::prompts;

/// Outcome of rewriting a follow-up question
#[derive(Debug)]
pub struct ContextualizedQuestion {
    pub question: String,
    /// Whether `question` differs from the input
    pub rewritten: bool,
    /// Set when the rewrite failed and the input was used unchanged
    pub warning: Option<DocQaError>,
}

impl ContextualizedQuestion {
    fn unchanged(question: &str, warning: Option<DocQaError>) -> Self {
        Self {
            question: question.to_string(),
            rewritten: false,
            warning,
        }
    }
}

/// Turns context-dependent follow-ups into standalone search queries
pub struct QueryContextualizer {
    llm: Arc<dyn LlmClient>,
    options: GenerationOptions,
}

impl QueryContextualizer {
    pub fn new(llm: Arc<dyn LlmClient>, options: GenerationOptions) -> Self {
        Self { llm, options }
    }

    /// Never fails: on any LLM problem the original question comes back
    /// with a warning attached
    pub async fn contextualize(
        &self,
        history: &[ConversationTurn],
        question: &str,
    ) -> ContextualizedQuestion {
        if history.is_empty() {
            return ContextualizedQuestion::unchanged(question, None);
        }

        let request = CompletionRequest::new(prompts::contextualize_messages(history, question))
            .with_options(&self.options);

        match self.llm.complete(request).await {
            Ok(response) => match clean_rewrite(&response.text) {
                Some(rewritten) => {
                    let changed = rewritten != question;
                    tracing::debug!(original = question, standalone = %rewritten, "Contextualized question");
                    ContextualizedQuestion {
                        question: rewritten,
                        rewritten: changed,
                        warning: None,
                    }
                }
                None => {
                    tracing::warn!("Contextualizer returned empty output, using original question");
                    ContextualizedQuestion::unchanged(
                        question,
                        Some(DocQaError::contextualization("model returned an empty rewrite")),
                    )
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Contextualization failed, using original question");
                ContextualizedQuestion::unchanged(
                    question,
                    Some(DocQaError::contextualization(e.to_string())),
                )
            }
        }
    }
}

/// Trim, drop a leading label and surrounding quotes
fn clean_rewrite(raw: &str) -> Option<String> {
    let mut text = raw.trim();

    for label in ["standalone question:", "question:"] {
        if text.len() >= label.len()
            && text.is_char_boundary(label.len())
            && text[..label.len()].eq_ignore_ascii_case(label)
        {
            text = text[label.len()..].trim_start();
            break;
        }
    }

    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”')] {
        if text.len() > 1 && text.starts_with(open) && text.ends_with(close) {
            text = text[open.len_utf8()..text.len() - close.len_utf8()].trim();
            break;
        }
    }

    (!text.is_empty()).then(|| text.to_string())
}
