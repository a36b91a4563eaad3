//! Storage paths for calltrack.
//!
//! All local file locations are decided here. Production code uses
//! `StorageConfig::from_home()` (rooted at `~/.calltrack`); tests inject a temp
//! directory with `StorageConfig::with_root()`.

use std::path::{Path, PathBuf};

use crate::error::{Result, TrackerError};

const ROOT_DIR: &str = ".calltrack";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves `~/.calltrack`.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(TrackerError::HomeDirNotFound)?;
        Ok(Self {
            root: home.join(ROOT_DIR),
        })
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to config.toml (endpoints, settle delay, call-log location).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to the daemon's Unix socket.
    pub fn socket_file(&self) -> PathBuf {
        self.root.join("daemon.sock")
    }

    /// Directory for rolling CLI logs.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Fallback call-log database location when none is configured.
    pub fn default_call_log(&self) -> PathBuf {
        self.root.join("calllog.db")
    }
}
