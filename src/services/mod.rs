pub mod embedding;
pub mod factory;
pub mod llm;
pub mod rag;
pub mod retry;

pub use factory::ProviderFactory;
pub use rag::{AskResponse, ConversationalRagOrchestrator, IngestReport, PipelineStage};
pub use retry::{RetryConfig, RetryHandler};
