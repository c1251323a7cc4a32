//! Tracing subscriber setup.
//!
//! Log lines always go to stderr, filtered by `RUST_LOG` (default level from
//! [`LogOptions`]). With a log directory configured they are also written,
//! without ANSI colors, to `<log_dir>/vboxctl.log` through a non-blocking
//! writer.
//!
//! The returned guard must be kept alive for the duration of the process so
//! that buffered lines are flushed on exit.

use crate::errors::{VboxError, VboxResult};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_NAME: &str = "vboxctl.log";

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Directory for the log file; stderr only when `None`.
    pub log_dir: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_level: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_level: "info".to_string(),
        }
    }
}

pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Install the global subscriber. Call once from `main`.
pub fn init_logging(options: &LogOptions) -> VboxResult<LogGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.default_level));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, file_guard) = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| VboxError::Config(format!("failed to initialize logging: {e}")))?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}
