use thiserror::Error;

use crate::services::llm::errors::extract_error_message;
use crate::services::retry::Retryable;

/// Errors raised while turning text into vectors
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded { message: String },

    #[error("Request timeout after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Provider returned {actual} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}

impl EmbeddingError {
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::RateLimitExceeded { .. }
            | EmbeddingError::Timeout { .. }
            | EmbeddingError::NetworkError { .. }
            | EmbeddingError::ProviderUnavailable { .. } => true,
            EmbeddingError::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            EmbeddingError::ConfigurationError { .. } => {
                "The embedding model is not configured correctly.".to_string()
            }
            EmbeddingError::AuthenticationFailed { .. } => {
                "Authentication with the embedding service failed. Please check your API key."
                    .to_string()
            }
            EmbeddingError::RateLimitExceeded { .. } => {
                "The embedding service is rate limiting requests. Please try again shortly."
                    .to_string()
            }
            EmbeddingError::Timeout { timeout_secs } => {
                format!("The embedding service did not answer within {timeout_secs} seconds.")
            }
            EmbeddingError::NetworkError { .. } | EmbeddingError::ProviderUnavailable { .. } => {
                "The embedding service is unavailable. Please check that it is running."
                    .to_string()
            }
            EmbeddingError::ServerError { .. } => {
                "The embedding service is experiencing issues. Please try again later."
                    .to_string()
            }
            EmbeddingError::InvalidRequest { .. }
            | EmbeddingError::ParseError { .. }
            | EmbeddingError::DimensionMismatch { .. }
            | EmbeddingError::CountMismatch { .. } => {
                "The embedding service returned an unexpected result.".to_string()
            }
        }
    }

    pub fn from_reqwest_error(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            EmbeddingError::Timeout { timeout_secs }
        } else if error.is_connect() {
            EmbeddingError::ProviderUnavailable {
                message: error.to_string(),
            }
        } else if let Some(status) = error.status() {
            Self::from_status_and_body(status, &error.to_string())
        } else {
            EmbeddingError::NetworkError {
                message: error.to_string(),
            }
        }
    }

    pub fn from_status_and_body(status: reqwest::StatusCode, body: &str) -> Self {
        let status_code = status.as_u16();
        let message = extract_error_message(body);

        match status_code {
            401 | 403 => EmbeddingError::AuthenticationFailed { message },
            429 => EmbeddingError::RateLimitExceeded { message },
            503 => EmbeddingError::ProviderUnavailable { message },
            500..=599 => EmbeddingError::ServerError {
                status: status_code,
                message,
            },
            _ => EmbeddingError::InvalidRequest {
                message: format!("HTTP {status_code}: {message}"),
            },
        }
    }
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        EmbeddingError::is_retryable(self)
    }
}
