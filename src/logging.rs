use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use crate::result::{IsrenError, Result};

/// Configuration for the logging system
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Log level for stderr output
    pub console_level: Level,
    /// Log level for file output
    pub file_level: Level,
    /// Directory where log files should be written
    pub log_dir: Option<PathBuf>,
    /// Whether to write the file log as JSON
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: Level::INFO,
            file_level: Level::DEBUG,
            log_dir: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from the debug flag and the environment
    pub fn from_env(debug: bool) -> Self {
        Self::from_lookup(debug, |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(debug: bool, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if debug {
            config.console_level = Level::DEBUG;
        }

        if let Some(log_dir) = lookup("ISREN_LOG_DIR").filter(|dir| !dir.is_empty()) {
            config.log_dir = Some(PathBuf::from(log_dir));
        }

        if lookup("ISREN_JSON_LOGS").is_some() {
            config.json_format = true;
        }

        config
    }
}

/// Initialize the logging system with the given configuration
///
/// Logs go to stderr; stdout carries the rendered issues. The returned guard
/// flushes the file log when dropped.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>> {
    let mut layers = vec![];
    let mut guard = None;

    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            IsrenError::General(format!("Failed to create log directory: {e}").into())
        })?;

        let file_appender = tracing_appender::rolling::daily(log_dir, "isren.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(filter(config.file_level))
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_filter(filter(config.file_level))
                .boxed()
        };

        layers.push(file_layer);
    }

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(filter(config.console_level))
        .boxed();
    layers.push(console_layer);

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| IsrenError::General(format!("Failed to initialize logging: {e}").into()))?;

    Ok(guard)
}

fn filter(level: Level) -> EnvFilter {
    EnvFilter::builder().with_default_directive(level.into()).from_env_lossy()
}
