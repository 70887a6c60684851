use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

use crate::env::logging as env_vars;

/// Logging configuration for docqa
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: Level,
    /// Whether to log to stdout
    pub stdout: bool,
    /// Optional file path for logging
    pub file_path: Option<PathBuf>,
    /// Whether to use JSON format
    pub json_format: bool,
    /// Whether to use ANSI colors
    pub use_colors: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            stdout: true,
            file_path: None,
            json_format: false,
            use_colors: true,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Enable/disable stdout logging
    pub fn with_stdout(mut self, enabled: bool) -> Self {
        self.stdout = enabled;
        self
    }

    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.use_colors = enabled;
        self
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level_str) = env::var(env_vars::LOG_LEVEL) {
            config.level = parse_level(&level_str);
        }

        if let Ok(file_path) = env::var(env_vars::LOG_FILE) {
            config.file_path = Some(PathBuf::from(file_path));
        }

        if env::var(env_vars::LOG_JSON).is_ok() {
            config.json_format = true;
        }

        if env::var(env_vars::NO_COLOR).is_ok() {
            config.use_colors = false;
        }

        config
    }

    /// Create a development config with debug logging
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            ..Self::default()
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Initialize logging with the given configuration
///
/// Stdout and file output are independent layers; a config with neither
/// installs a subscriber that drops everything.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let level = LevelFilter::from_level(config.level);

    let stdout_layer = config.stdout.then(|| {
        if config.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_filter(level)
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(config.use_colors)
                .with_level(true)
                .with_target(true)
                .with_filter(level)
                .boxed()
        }
    });

    let file_layer = match &config.file_path {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&directory)
                .with_context(|| format!("Failed to create log directory {}", directory.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "docqa.log".into());
            let appender = tracing_appender::rolling::never(directory, file_name);
            Some(
                fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(level)
                    .boxed(),
            )
        }
        None => None,
    };

    Registry::default()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Logging was already initialized")?;

    tracing::debug!(
        level = ?config.level,
        stdout = config.stdout,
        file_path = ?config.file_path,
        json_format = config.json_format,
        "Logging initialized"
    );

    Ok(())
}

/// Initialize logging from environment variables
pub fn init_from_env() -> Result<()> {
    init_logging(LoggingConfig::from_env())
}

/// Log error with context
pub fn log_error<E: std::fmt::Display>(error: &E, context: &str) {
    tracing::error!(error = %error, context = context, "Error occurred");
}

/// Log performance metrics
pub fn log_performance(operation: &str, duration_ms: u64, success: bool) {
    if success {
        tracing::info!(
            operation = operation,
            duration_ms = duration_ms,
            success = success,
            "Operation completed"
        );
    } else {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            success = success,
            "Operation failed"
        );
    }
}
