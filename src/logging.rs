//! Logging initialisation
//!
//! Console output goes to stderr so it never interleaves with streamed model
//! text on stdout. Setting `AGENT_LOG_DIR` adds a JSON log file rotated daily.

use std::path::PathBuf;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "agentic_runner=info";

const ENV_LOG_DIR: &str = "AGENT_LOG_DIR";
const LOG_FILE_PREFIX: &str = "agentic-runner.log";

/// Install the global tracing subscriber
///
/// Returns the file writer guard when file logging is on; keep it alive until
/// exit or buffered lines are lost.
pub fn init_logging() -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    let log_dir = log_dir(std::env::var(ENV_LOG_DIR).ok());
    let (file_layer, guard) = match &log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    if let Some(dir) = &log_dir {
        tracing::info!("[Logging] Writing JSON logs to {:?}", dir);
    }

    Ok(guard)
}

fn log_dir(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_parsing() {
        assert_eq!(log_dir(None), None);
        assert_eq!(log_dir(Some("  ".into())), None);
        assert_eq!(log_dir(Some("/tmp/logs".into())), Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }
}
