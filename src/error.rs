use thiserror::Error;

use crate::services::embedding::EmbeddingError;
use crate::services::llm::LlmError;
use crate::services::rag::VectorIndexError;

/// Error types for the document question-answering pipeline
#[derive(Error, Debug)]
pub enum DocQaError {
    #[error("Chunking error: {message}")]
    Chunking { message: String },

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Retrieval error: {message}")]
    Retrieval {
        message: String,
        #[source]
        source: Option<RetrievalCause>,
    },

    #[error("Contextualization error: {message}")]
    Contextualization { message: String },

    #[error("Generation error: {0}")]
    Generation(#[source] LlmError),

    #[error("Document not ready: {document_id}: {reason}")]
    DocumentNotReady { document_id: String, reason: String },

    #[error("Document not found: {document_id}")]
    DocumentNotFound { document_id: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Operation cancelled during {stage}")]
    Cancelled { stage: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Underlying failure behind a retrieval error
#[derive(Error, Debug)]
pub enum RetrievalCause {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] VectorIndexError),
}

impl DocQaError {
    pub fn chunking<S: Into<String>>(message: S) -> Self {
        Self::Chunking {
            message: message.into(),
        }
    }

    pub fn contextualization<S: Into<String>>(message: S) -> Self {
        Self::Contextualization {
            message: message.into(),
        }
    }

    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn cancelled<S: Into<String>>(stage: S) -> Self {
        Self::Cancelled {
            stage: stage.into(),
        }
    }

    /// Create a retrieval error caused by a failed query embedding
    pub fn retrieval_embedding(source: EmbeddingError) -> Self {
        Self::Retrieval {
            message: "failed to embed query".to_string(),
            source: Some(RetrievalCause::Embedding(source)),
        }
    }

    /// Create a retrieval error caused by a failed index search
    pub fn retrieval_index(source: VectorIndexError) -> Self {
        Self::Retrieval {
            message: "vector search failed".to_string(),
            source: Some(RetrievalCause::Index(source)),
        }
    }

    pub fn document_not_ready<S: Into<String>>(document_id: S, reason: S) -> Self {
        Self::DocumentNotReady {
            document_id: document_id.into(),
            reason: reason.into(),
        }
    }

    pub fn document_not_found<S: Into<String>>(document_id: S) -> Self {
        Self::DocumentNotFound {
            document_id: document_id.into(),
        }
    }

    pub fn session_not_found<S: Into<String>>(session_id: S) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Check if the same call could succeed if repeated later
    pub fn is_retryable(&self) -> bool {
        match self {
            DocQaError::Embedding(e) => e.is_retryable(),
            DocQaError::Generation(e) => e.is_retryable(),
            DocQaError::Retrieval {
                source: Some(RetrievalCause::Embedding(e)),
                ..
            } => e.is_retryable(),
            DocQaError::Cancelled { .. } | DocQaError::Io(_) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            DocQaError::Chunking { .. } => "chunking",
            DocQaError::Embedding(_) => "embedding",
            DocQaError::Retrieval { .. } => "retrieval",
            DocQaError::Contextualization { .. } => "contextualization",
            DocQaError::Generation(_) => "generation",
            DocQaError::DocumentNotReady { .. } => "document_not_ready",
            DocQaError::DocumentNotFound { .. } => "not_found",
            DocQaError::SessionNotFound { .. } => "not_found",
            DocQaError::Cancelled { .. } => "cancelled",
            DocQaError::InvalidConfig { .. } => "config",
            DocQaError::Io(_) => "io",
            DocQaError::Json(_) => "json",
            DocQaError::Toml(_) => "toml",
        }
    }

    /// Convert to a message that is safe to show to end users
    ///
    /// Provider responses, URLs and keys never appear in the result.
    pub fn user_message(&self) -> String {
        match self {
            DocQaError::Chunking { message } => {
                format!("The document could not be processed: {message}")
            }
            DocQaError::Embedding(e) => e.user_message(),
            DocQaError::Retrieval {
                source: Some(RetrievalCause::Embedding(e)),
                ..
            } => e.user_message(),
            DocQaError::Retrieval { .. } => {
                "Searching the document failed. Please try again.".to_string()
            }
            DocQaError::Contextualization { .. } => {
                "The question could not be rephrased; it was used as written.".to_string()
            }
            DocQaError::Generation(e) => e.user_message(),
            DocQaError::DocumentNotReady { document_id, .. } => {
                format!("Document '{document_id}' is not ready. Please ingest it again.")
            }
            DocQaError::DocumentNotFound { document_id } => {
                format!("Document '{document_id}' has not been ingested.")
            }
            DocQaError::SessionNotFound { session_id } => {
                format!("Conversation '{session_id}' does not exist.")
            }
            DocQaError::Cancelled { .. } => "The request was cancelled.".to_string(),
            DocQaError::InvalidConfig { message } => format!("Configuration error: {message}"),
            DocQaError::Io(_) => "A file could not be read or written.".to_string(),
            DocQaError::Json(_) | DocQaError::Toml(_) => {
                "A configuration or data file is malformed.".to_string()
            }
        }
    }
}

/// Result type alias for docqa
pub type Result<T> = std::result::Result<T, DocQaError>;
