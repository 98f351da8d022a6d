use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingSection;

/// Prefix of the daily rolling log files.
pub const LOG_FILE_PREFIX: &str = "kanban.log";

/// `RUST_LOG` wins over the configured directive.
fn env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log filter '{}'", level)),
    }
}

/// Install the global subscriber. Logs go to stderr, or to daily rolling
/// files when `logging.directory` is set; keep the returned guard alive
/// until exit so buffered lines are flushed.
pub fn init_tracing(logging: &LoggingSection, level: &str) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(level)?;
    let (writer, guard) = match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(logging.directory.is_none());
    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to init subscriber: {}", e))?;

    tracing::debug!(level, json = logging.json, directory = ?logging.directory, "Logging initialized");
    Ok(guard)
}
