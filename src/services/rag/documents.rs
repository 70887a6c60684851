use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{DocQaError, Result};
use crate::models::DocumentStatus;

use super::vector_index::VectorIndex;

#[derive(Debug, Clone)]
struct DocumentEntry {
    status: DocumentStatus,
    content_hash: String,
    index: Option<Arc<VectorIndex>>,
    /// Ingest that owns this entry; results of older ingests are dropped
    generation: u64,
}

/// Ingested documents, their status and built indexes
///
/// A ready index is reused when the same document id is ingested again with
/// identical content. Overlapping ingests of one id resolve to the most
/// recently started one.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: RwLock<HashMap<String, DocumentEntry>>,
    next_generation: AtomicU64,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ready index for `document_id` if it was built from `content_hash`
    pub async fn cached_index(&self, document_id: &str, content_hash: &str) -> Option<Arc<VectorIndex>> {
        let documents = self.documents.read().await;
        documents
            .get(document_id)
            .filter(|entry| entry.status.is_ready() && entry.content_hash == content_hash)
            .and_then(|entry| entry.index.clone())
    }

    /// Start an ingest of `document_id` and return its generation
    pub async fn mark_indexing(&self, document_id: &str, content_hash: &str) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.documents.write().await.insert(
            document_id.to_string(),
            DocumentEntry {
                status: DocumentStatus::Indexing,
                content_hash: content_hash.to_string(),
                index: None,
                generation,
            },
        );
        generation
    }

    /// Publish the index built by `generation`
    ///
    /// Returns false, leaving the entry alone, when a newer ingest has
    /// started since.
    pub async fn mark_ready(
        &self,
        document_id: &str,
        generation: u64,
        index: Arc<VectorIndex>,
    ) -> bool {
        let mut documents = self.documents.write().await;
        match documents.get_mut(document_id) {
            Some(entry) if entry.generation == generation => {
                entry.status = DocumentStatus::Ready;
                entry.index = Some(index);
                true
            }
            _ => false,
        }
    }

    /// Record that `generation` failed; a no-op once superseded
    pub async fn mark_failed(&self, document_id: &str, generation: u64, reason: String) -> bool {
        let mut documents = self.documents.write().await;
        match documents.get_mut(document_id) {
            Some(entry) if entry.generation == generation => {
                entry.status = DocumentStatus::Failed { reason };
                entry.index = None;
                true
            }
            _ => false,
        }
    }

    pub async fn status(&self, document_id: &str) -> Option<DocumentStatus> {
        self.documents
            .read()
            .await
            .get(document_id)
            .map(|entry| entry.status.clone())
    }

    /// Index to search for `document_id`
    pub async fn ready_index(&self, document_id: &str) -> Result<Arc<VectorIndex>> {
        let documents = self.documents.read().await;
        let entry = documents
            .get(document_id)
            .ok_or_else(|| DocQaError::document_not_found(document_id))?;

        match (&entry.status, &entry.index) {
            (DocumentStatus::Ready, Some(index)) => Ok(index.clone()),
            (DocumentStatus::Failed { reason }, _) => {
                Err(DocQaError::document_not_ready(document_id, reason.as_str()))
            }
            _ => Err(DocQaError::document_not_ready(document_id, "indexing in progress")),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}
