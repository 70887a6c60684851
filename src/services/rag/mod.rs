//! Retrieval-augmented question answering over one document per session

pub mod chunker;
pub mod contextualizer;
pub mod documents;
pub mod generator;
pub mod memory;
pub mod orchestrator;
pub mod prompts;
pub mod retriever;
pub mod vector_index;

pub use chunker::{expected_chunk_count, reconstruct, ChunkerConfig, DocumentChunker};
pub use contextualizer::{ContextualizedQuestion, QueryContextualizer};
pub use documents::DocumentRegistry;
pub use generator::{AnswerGenerator, GeneratedAnswer};
pub use memory::{PipelineStage, SessionStore};
pub use orchestrator::{AskResponse, ConversationalRagOrchestrator, IngestReport};
pub use prompts::NOT_FOUND_MARKER;
pub use retriever::{Retriever, DEFAULT_TOP_K};
pub use vector_index::{VectorIndex, VectorIndexError};
