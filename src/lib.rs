pub mod cli;
pub mod config;
pub mod models;
pub mod services;

pub mod env;
pub mod error;
pub mod logging;

pub use config::{AppConfig, RagConfig};
pub use error::{DocQaError, Result};
pub use logging::{init_logging, LoggingConfig};
pub use services::{AskResponse, ConversationalRagOrchestrator, IngestReport, ProviderFactory};
