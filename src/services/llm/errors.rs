//! LLM error types for multi-provider support
//!
//! Provider adapters map transport and HTTP failures into these variants so
//! the pipeline can decide what to retry without knowing the provider.

use thiserror::Error;

use crate::services::retry::Retryable;

/// Provider-agnostic LLM errors
#[derive(Debug, Error)]
pub enum LlmError {
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

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String },

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Provider unavailable: {message}")]
    ProviderUnavailable { message: String },
}

impl LlmError {
    /// Check if this error is potentially retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimitExceeded { .. }
            | LlmError::Timeout { .. }
            | LlmError::NetworkError { .. }
            | LlmError::ProviderUnavailable { .. } => true,
            LlmError::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Convert to user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            LlmError::ConfigurationError { .. } => {
                "The language model is not configured correctly.".to_string()
            }
            LlmError::AuthenticationFailed { .. } => {
                "Authentication with the language model failed. Please check your API key."
                    .to_string()
            }
            LlmError::RateLimitExceeded { .. } => {
                "Rate limit exceeded. Please wait a moment and try again.".to_string()
            }
            LlmError::Timeout { timeout_secs } => {
                format!("The language model did not answer within {timeout_secs} seconds.")
            }
            LlmError::NetworkError { .. } => {
                "Network connection error. Please check that the model server is reachable."
                    .to_string()
            }
            LlmError::QuotaExceeded { .. } => {
                "API quota exceeded. Please check your usage limits.".to_string()
            }
            LlmError::ServerError { .. } | LlmError::ProviderUnavailable { .. } => {
                "The language model service is experiencing issues. Please try again later."
                    .to_string()
            }
            LlmError::ParseError { .. } | LlmError::InvalidResponse { .. } => {
                "Received an invalid response from the language model. Please try again."
                    .to_string()
            }
            LlmError::InvalidRequest { .. } => {
                "The language model rejected the request.".to_string()
            }
        }
    }

    pub fn from_reqwest_error(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            LlmError::Timeout { timeout_secs }
        } else if let Some(status) = error.status() {
            Self::from_status_and_body(status, &error.to_string())
        } else {
            LlmError::NetworkError {
                message: error.to_string(),
            }
        }
    }

    pub fn from_status_and_body(status: reqwest::StatusCode, body: &str) -> Self {
        let status_code = status.as_u16();
        let message = extract_error_message(body);

        match status_code {
            400 | 404 | 422 => LlmError::InvalidRequest { message },
            401 => LlmError::AuthenticationFailed { message },
            403 => {
                if message.to_lowercase().contains("quota") {
                    LlmError::QuotaExceeded { message }
                } else {
                    LlmError::AuthenticationFailed { message }
                }
            }
            429 => LlmError::RateLimitExceeded { message },
            503 => LlmError::ProviderUnavailable { message },
            500..=599 => LlmError::ServerError {
                status: status_code,
                message,
            },
            _ => LlmError::InvalidRequest {
                message: format!("HTTP {status_code}: {message}"),
            },
        }
    }
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        LlmError::is_retryable(self)
    }
}

/// Pull `error.message` (OpenAI) or `error` (Ollama) out of a JSON error body
pub(crate) fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            let error = value.get("error");
            error
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .or_else(|| error.and_then(|e| e.as_str()))
                .unwrap_or(body)
                .to_string()
        }
        Err(_) => body.to_string(),
    }
}
