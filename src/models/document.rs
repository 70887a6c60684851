use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of the text
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DocumentStatus {
    Indexing,
    Ready,
    Failed { reason: String },
}

impl DocumentStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, DocumentStatus::Ready)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Indexing => write!(f, "indexing"),
            DocumentStatus::Ready => write!(f, "ready"),
            DocumentStatus::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}
