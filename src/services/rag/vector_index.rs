//! Exact in-memory nearest-neighbour search over chunk embeddings

use thiserror::Error;

use crate::models::{Chunk, ScoredChunk};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VectorIndexError {
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Got {chunks} chunks but {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },
}

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
    norm: f32,
}

/// Brute-force cosine index with a fixed dimension
///
/// Built once per document and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add chunks with their vectors; on error nothing is added
    pub fn add(&mut self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<(), VectorIndexError> {
        if chunks.len() != vectors.len() {
            return Err(VectorIndexError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.entries.reserve(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            let norm = l2_norm(&vector);
            self.entries.push(IndexEntry {
                chunk,
                vector,
                norm,
            });
        }
        Ok(())
    }

    /// Up to `k` chunks by descending cosine similarity
    ///
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine(query, query_norm, entry)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| ScoredChunk {
                chunk: self.entries[position].chunk.clone(),
                score,
            })
            .collect())
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(query: &[f32], query_norm: f32, entry: &IndexEntry) -> f32 {
    if query_norm == 0.0 || entry.norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(&entry.vector).map(|(a, b)| a * b).sum();
    dot / (query_norm * entry.norm)
}
