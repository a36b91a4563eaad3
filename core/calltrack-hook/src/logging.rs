//! File logging for the `calltrack` CLI.
//!
//! Telephony hooks invoke the CLI without a terminal, so events go to a daily
//! rolling file under `~/.calltrack/logs`. If the directory can't be set up we
//! fall back to stderr rather than fail the command.

use calltrack_core::StorageConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const LOG_PREFIX: &str = "calltrack";
const LOG_SUFFIX: &str = "log";
const MAX_LOG_FILES: usize = 7;

/// Installs the global subscriber. Keep the guard alive until exit so buffered
/// lines are flushed.
pub fn init() -> Option<WorkerGuard> {
    let debug_enabled = std::env::var("CALLTRACK_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let appender = StorageConfig::from_home()
        .map_err(|err| err.to_string())
        .and_then(|storage| {
            let dir = storage.logs_dir();
            fs_err::create_dir_all(&dir).map_err(|err| err.to_string())?;
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_PREFIX)
                .filename_suffix(LOG_SUFFIX)
                .max_log_files(MAX_LOG_FILES)
                .build(dir)
                .map_err(|err| err.to_string())
        });

    match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        Err(err) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!(error = %err, "File logging unavailable; logging to stderr");
            None
        }
    }
}
