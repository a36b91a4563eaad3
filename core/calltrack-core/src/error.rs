//! Error types for calltrack-core operations.
//!
//! Every pipeline failure is terminal for the current run. Callers log and move
//! on; nothing here is retried.

use std::path::PathBuf;

/// All errors that can occur in calltrack-core operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    // ─────────────────────────────────────────────────────────────────────
    // Call Log Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Call history is empty")]
    NoRecordsAvailable,

    #[error("Most recent call-log row is malformed: {details}")]
    MalformedRecord { details: String },

    #[error("Call log access failed: {context}: {source}")]
    CallLog {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Pipeline Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Call at timestamp {timestamp} was already processed")]
    DuplicateEvent { timestamp: i64 },

    #[error("Remote write to {endpoint} failed: {details}")]
    RemoteWriteFailure { endpoint: String, details: String },

    #[error("No pending tag prompt for {phone_number}")]
    NoPendingPrompt { phone_number: String },

    #[error("Background task failed: {details}")]
    Task { details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl TrackerError {
    /// Stable machine-readable code, used at the IPC boundary.
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::NoRecordsAvailable => "no_records_available",
            TrackerError::MalformedRecord { .. } => "malformed_record",
            TrackerError::CallLog { .. } => "call_log_error",
            TrackerError::DuplicateEvent { .. } => "duplicate_event",
            TrackerError::RemoteWriteFailure { .. } => "remote_write_failure",
            TrackerError::NoPendingPrompt { .. } => "no_pending_prompt",
            TrackerError::Task { .. } => "task_failed",
            TrackerError::HomeDirNotFound => "home_dir_not_found",
            TrackerError::ConfigMalformed { .. } => "config_malformed",
            TrackerError::Io { .. } => "io_error",
        }
    }
}

/// Convenience type alias for Results using TrackerError.
pub type Result<T> = std::result::Result<T, TrackerError>;

impl From<TrackerError> for String {
    fn from(err: TrackerError) -> String {
        err.to_string()
    }
}

impl From<tokio::task::JoinError> for TrackerError {
    fn from(err: tokio::task::JoinError) -> Self {
        TrackerError::Task {
            details: err.to_string(),
        }
    }
}
