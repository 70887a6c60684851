//! Provider adapters implementing the LlmClient trait

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiCompatibleClient;
