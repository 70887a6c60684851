//! Environment variable constants used throughout the application
//!
//! This module centralizes all environment variable names to ensure consistency
//! and make it easier to manage configuration across the codebase.

/// Logging configuration
pub mod logging {
    /// Log level configuration (e.g., "debug", "info", "warn", "error")
    pub const LOG_LEVEL: &str = "DOCQA_LOG_LEVEL";

    /// Log file path for file-based logging
    pub const LOG_FILE: &str = "DOCQA_LOG_FILE";

    /// Emit logs as JSON lines
    pub const LOG_JSON: &str = "DOCQA_LOG_JSON";

    /// Disable colored output (follows the NO_COLOR standard)
    pub const NO_COLOR: &str = "NO_COLOR";
}

/// Application configuration file
pub mod config {
    /// Explicit path to a TOML configuration file
    pub const CONFIG_FILE: &str = "DOCQA_CONFIG";
}

/// Chat model selection
pub mod llm {
    /// Provider for chat completions: "ollama" | "openai" | "xai"
    pub const LLM_PROVIDER: &str = "DOCQA_LLM_PROVIDER";

    /// Model identifier for chat completions (provider-specific)
    pub const LLM_MODEL: &str = "DOCQA_LLM_MODEL";

    /// Request timeout for chat completions in seconds
    pub const LLM_TIMEOUT: &str = "DOCQA_LLM_TIMEOUT";
}

/// Embedding model selection
pub mod embedding {
    /// Provider for embeddings: "ollama" | "openai"
    pub const EMBEDDING_PROVIDER: &str = "DOCQA_EMBEDDING_PROVIDER";

    /// Model identifier for embeddings (provider-specific)
    pub const EMBEDDING_MODEL: &str = "DOCQA_EMBEDDING_MODEL";
}

/// Ollama server configuration
pub mod ollama {
    /// Ollama server URL (default: http://localhost:11434)
    pub const BASE_URL: &str = "OLLAMA_BASE_URL";

    /// Chat model served by Ollama
    pub const CHAT_MODEL: &str = "OLLAMA_CHAT_MODEL";

    /// Embedding model served by Ollama
    pub const EMBED_MODEL: &str = "OLLAMA_EMBED_MODEL";
}

/// External API configuration
pub mod apis {
    /// OpenAI API key
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

    /// Override for OpenAI-compatible endpoints
    pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";

    /// xAI (Grok) API key
    pub const XAI_API_KEY: &str = "XAI_API_KEY";
}

/// Retrieval pipeline tuning
pub mod rag {
    /// Chunk size in characters
    pub const CHUNK_SIZE: &str = "DOCQA_CHUNK_SIZE";

    /// Overlap between consecutive chunks in characters
    pub const CHUNK_OVERLAP: &str = "DOCQA_CHUNK_OVERLAP";

    /// Number of chunks retrieved per question
    pub const TOP_K: &str = "DOCQA_TOP_K";

    /// Maximum turns kept per conversation session
    pub const MAX_TURNS: &str = "DOCQA_MAX_TURNS";
}
