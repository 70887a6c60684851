//! Prompt text and message assembly for each pipeline stage

use crate::models::{Chunk, ConversationTurn, ScoredChunk, TurnRole};
use crate::services::llm::ChatMessage;

/// Exact reply the model must give when the context lacks the answer
pub const NOT_FOUND_MARKER: &str = "[NOT FOUND IN PROVIDED CONTEXT]";

pub const CONTEXTUALIZE_SYSTEM_PROMPT: &str = "\
Given the conversation so far and a follow-up question, rewrite the follow-up \
into a standalone question that can be understood without the conversation. \
Replace pronouns and references with the things they refer to. \
Do NOT answer the question. If it is already standalone, return it as is. \
Reply with the question only.";

pub const GENERAL_SYSTEM_PROMPT: &str = "\
You are a friendly and helpful AI assistant. \
Give clear, useful and detailed answers to the user's questions.";

fn answer_system_prompt(context: &str) -> String {
    format!(
        "You answer questions about a document using ONLY the context below.\n\
         Each passage is labeled like [chunk 1]. Cite the labels of the passages you used.\n\
         Do not use outside knowledge. If the context does not contain the answer, \
         reply with exactly {NOT_FOUND_MARKER} and nothing else.\n\n\
         <context>\n{context}\n</context>"
    )
}

/// Render chunks as `[chunk N]` blocks in relevance order
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(position, scored)| format!("{}\n{}", Chunk::label(position), scored.chunk.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn history_messages(history: &[ConversationTurn]) -> impl Iterator<Item = ChatMessage> + '_ {
    history.iter().map(|turn| match turn.role {
        TurnRole::User => ChatMessage::user(turn.content.clone()),
        TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
    })
}

fn with_history(system: String, history: &[ConversationTurn], question: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend(history_messages(history));
    messages.push(ChatMessage::user(question));
    messages
}

pub fn contextualize_messages(history: &[ConversationTurn], question: &str) -> Vec<ChatMessage> {
    with_history(CONTEXTUALIZE_SYSTEM_PROMPT.to_string(), history, question)
}

pub fn answer_messages(
    question: &str,
    chunks: &[ScoredChunk],
    history: &[ConversationTurn],
) -> Vec<ChatMessage> {
    with_history(answer_system_prompt(&format_context(chunks)), history, question)
}

pub fn general_messages(history: &[ConversationTurn], question: &str) -> Vec<ChatMessage> {
    with_history(GENERAL_SYSTEM_PROMPT.to_string(), history, question)
}
