//! Overlapping character-window chunking
//!
//! Chunk `i` starts at `i * (chunk_size - overlap)` characters. Its end may be
//! pulled back to a paragraph, sentence or word boundary, but never before the
//! next chunk's start, so consecutive chunks always touch or overlap and the
//! text can be rebuilt from offsets alone.

use crate::error::{DocQaError, Result};
use crate::models::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    pub snap_to_boundaries: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
            snap_to_boundaries: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentChunker {
    config: ChunkerConfig,
}

impl DocumentChunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(DocQaError::chunking("chunk_size must be positive"));
        }
        if config.overlap >= config.chunk_size {
            return Err(DocQaError::chunking(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                config.overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    fn stride(&self) -> usize {
        self.config.chunk_size - self.config.overlap
    }

    /// Split `text` into ordered chunks covering all of it
    ///
    /// Whitespace-only input yields no chunks.
    pub fn chunk(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let chunk_size = self.config.chunk_size;
        let stride = self.stride();

        let mut chunks = Vec::with_capacity(expected_chunk_count(len, chunk_size, self.config.overlap));
        let mut start = 0;

        loop {
            if len - start <= chunk_size {
                chunks.push(make_chunk(document_id, chunks.len(), &chars, start, len));
                break;
            }

            let hard_end = start + chunk_size;
            let end = if self.config.snap_to_boundaries {
                find_boundary(&chars, start + stride, hard_end).unwrap_or(hard_end)
            } else {
                hard_end
            };

            chunks.push(make_chunk(document_id, chunks.len(), &chars, start, end));
            start += stride;
        }

        tracing::debug!(
            document_id,
            chars = len,
            chunks = chunks.len(),
            chunk_size,
            overlap = self.config.overlap,
            "Chunked document"
        );

        chunks
    }
}

/// Number of chunks produced for `len` characters
pub fn expected_chunk_count(len: usize, chunk_size: usize, overlap: usize) -> usize {
    if len == 0 {
        0
    } else if len <= chunk_size {
        1
    } else {
        let stride = chunk_size - overlap;
        (len - overlap).div_ceil(stride)
    }
}

fn make_chunk(document_id: &str, index: usize, chars: &[char], start: usize, end: usize) -> Chunk {
    Chunk::new(document_id, index, chars[start..end].iter().collect(), start, end)
}

/// Latest cut position in `[lo, hi]`, preferring paragraph, then sentence,
/// then whitespace boundaries
fn find_boundary(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    let window = lo..=hi;

    let paragraph = window
        .clone()
        .rev()
        .find(|&end| end >= 2 && chars[end - 2] == '\n' && chars[end - 1] == '\n');
    if paragraph.is_some() {
        return paragraph;
    }

    let sentence = window.clone().rev().find(|&end| {
        end >= 1
            && matches!(chars[end - 1], '.' | '?' | '!' | '\n')
            && chars.get(end).map_or(true, |c| c.is_whitespace())
    });
    if sentence.is_some() {
        return sentence;
    }

    window
        .rev()
        .find(|&end| chars.get(end).is_some_and(|c| c.is_whitespace()))
}

/// Rebuild the source text from ordered chunks by dropping overlaps
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut covered = 0usize;

    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.start);
        text.extend(chunk.text.chars().skip(skip));
        covered = covered.max(chunk.end);
    }

    text
}
