pub mod chunk;
pub mod conversation;
pub mod document;

pub use chunk::{Chunk, ScoredChunk};
pub use conversation::{ConversationSession, ConversationTurn, TurnRole};
pub use document::{content_hash, DocumentStatus};
