pub mod ask;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod providers;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::runtime::Runtime;
use tracing::Level;

use crate::config::AppConfig;
use crate::env::logging as env_logging;
use crate::logging::LoggingConfig;
use crate::services::{ConversationalRagOrchestrator, IngestReport, ProviderFactory};

pub(crate) static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
pub(crate) static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[X] ");
pub(crate) static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[!] ");

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about a document, with follow-ups")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ~/.docqa/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to the terminal
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a single question
    Ask {
        /// Question to answer
        question: String,
        /// Text or markdown file to answer from; omit for plain chat
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Chunks to retrieve (overrides config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive conversation about a document
    Chat {
        /// Text or markdown file to talk about; omit for plain chat
        file: Option<PathBuf>,
    },
    /// Show how a file would be split into chunks
    Chunk {
        file: PathBuf,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
        /// Cut at exact character positions
        #[arg(long)]
        no_snap: bool,
        /// Print every chunk's text
        #[arg(long)]
        show: bool,
    },
    /// Check which chat and embedding providers are usable
    Providers,
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print effective settings (file + environment)
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Logging setup for this invocation
    ///
    /// The terminal only shows warnings unless `--verbose` or
    /// `DOCQA_LOG_LEVEL` says otherwise; the chat REPL keeps the terminal
    /// clean and logs to `DOCQA_LOG_FILE` only.
    pub fn logging_config(&self) -> LoggingConfig {
        let mut logging = LoggingConfig::from_env();
        if self.verbose {
            logging = logging.with_level(Level::DEBUG);
        } else if std::env::var(env_logging::LOG_LEVEL).is_err() {
            logging = logging.with_level(Level::WARN);
        }
        if matches!(self.command, Commands::Chat { .. }) && !self.verbose {
            logging = logging.with_stdout(false);
        }
        logging
    }

    pub fn run(self) -> Result<()> {
        let rt = Runtime::new()?;
        let config_path = self.config;

        rt.block_on(async move {
            match self.command {
                Commands::Ask {
                    question,
                    file,
                    top_k,
                    json,
                } => {
                    let mut config = load_config(config_path.as_deref())?;
                    if let Some(top_k) = top_k {
                        config.rag.top_k = top_k;
                    }
                    ask::handle_ask_command(config, file, question, json).await
                }
                Commands::Chat { file } => {
                    let config = load_config(config_path.as_deref())?;
                    chat::handle_chat_command(config, file).await
                }
                Commands::Chunk {
                    file,
                    chunk_size,
                    overlap,
                    no_snap,
                    show,
                } => {
                    let mut config = load_config(config_path.as_deref())?;
                    if let Some(size) = chunk_size {
                        config.rag.chunk_size = size;
                    }
                    if let Some(overlap) = overlap {
                        config.rag.chunk_overlap = overlap;
                    }
                    if no_snap {
                        config.rag.snap_to_boundaries = false;
                    }
                    chunk::handle_chunk_command(config, file, show)
                }
                Commands::Providers => {
                    let config = load_config(config_path.as_deref())?;
                    providers::handle_providers_command(config).await
                }
                Commands::Config { command } => match command {
                    ConfigCommands::Show => config::handle_show_command(config_path.as_deref()),
                    ConfigCommands::Init { force } => {
                        config::handle_init_command(config_path.as_deref(), force)
                    }
                },
            }
        })
    }
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    AppConfig::load(path).context("Failed to load configuration")
}

/// Document id used for a file: its file name
pub(crate) fn document_id_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub(crate) fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
}

pub(crate) fn build_orchestrator(config: &AppConfig) -> Result<ConversationalRagOrchestrator> {
    let (llm, embedder) = ProviderFactory::from_config(config).map_err(user_error)?;
    let orchestrator = ConversationalRagOrchestrator::new(llm, embedder, config.rag.clone())?
        .with_generation_options(config.llm.generation.clone());
    Ok(orchestrator)
}

/// Read and index `path`, with a spinner while it runs
pub(crate) async fn ingest_file(
    orchestrator: &Arc<ConversationalRagOrchestrator>,
    path: &Path,
) -> Result<(String, IngestReport)> {
    let document_id = document_id_for(path);
    let text = read_document(path)?;

    let spinner = spinner(format!("Indexing {document_id}..."))?;
    let result = orchestrator.ingest(&document_id, &text).await;
    spinner.finish_and_clear();

    let report = result.map_err(user_error)?;
    println!(
        "{}{} {}",
        CHECK,
        style(&document_id).bold(),
        style(format!(
            "{} chunks, {}-dim vectors, {:.1}s",
            report.chunk_count,
            report.dimension,
            report.elapsed.as_secs_f32()
        ))
        .dim()
    );
    Ok((document_id, report))
}

pub(crate) fn spinner(message: String) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Show the safe message to the user, keep the detail in the error chain
pub(crate) fn user_error(error: crate::error::DocQaError) -> anyhow::Error {
    let message = error.user_message();
    anyhow::Error::new(error).context(message)
}
