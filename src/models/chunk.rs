use serde::{Deserialize, Serialize};

/// A contiguous span of a document
///
/// Offsets are character positions, `start` inclusive and `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub index: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn new(document_id: &str, index: usize, text: String, start: usize, end: usize) -> Self {
        Self {
            id: format!("{document_id}#{index}"),
            document_id: document_id.to_string(),
            index,
            text,
            start,
            end,
        }
    }

    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    /// Label used to cite this chunk in prompts, 1-based
    pub fn label(position: usize) -> String {
        format!("[chunk {}]", position + 1)
    }
}

/// A chunk with its similarity to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}
