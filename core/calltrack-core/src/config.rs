//! Runtime configuration (`~/.calltrack/config.toml`).
//!
//! A missing file means defaults. Environment variables override individual
//! fields after the file is read.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TrackerError};

pub const DEFAULT_STUB_URL: &str = "http://192.168.31.7:8000/api/call-log/";
pub const DEFAULT_COMPLETION_URL: &str = "http://crm.isecuresolutions.in/api/call-log/";
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1500;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const STUB_URL_ENV: &str = "CALLTRACK_STUB_URL";
const COMPLETION_URL_ENV: &str = "CALLTRACK_COMPLETION_URL";
const CALL_LOG_ENV: &str = "CALLTRACK_CALL_LOG";
const SETTLE_DELAY_ENV: &str = "CALLTRACK_SETTLE_DELAY_MS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub call_log: CallLogConfig,
}

/// The stub and completion writes go to separate endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_stub_url")]
    pub stub_url: String,
    #[serde(default = "default_completion_url")]
    pub completion_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            stub_url: default_stub_url(),
            completion_url: default_completion_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Wait between the idle signal and the call-log read.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl PipelineConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallLogConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_stub_url() -> String {
    DEFAULT_STUB_URL.to_string()
}

fn default_completion_url() -> String {
    DEFAULT_COMPLETION_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

/// Reads `path` if it exists, then applies environment overrides.
pub fn load_config(path: &Path) -> Result<TrackerConfig> {
    let mut config = read_config_file(path)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<TrackerConfig> {
    if !path.exists() {
        return Ok(TrackerConfig::default());
    }

    let content = fs_err::read_to_string(path).map_err(|source| TrackerError::Io {
        context: format!("reading {}", path.display()),
        source,
    })?;
    toml::from_str::<TrackerConfig>(&content).map_err(|err| TrackerError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

impl TrackerConfig {
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty(STUB_URL_ENV) {
            self.remote.stub_url = url;
        }
        if let Some(url) = non_empty(COMPLETION_URL_ENV) {
            self.remote.completion_url = url;
        }
        if let Some(path) = non_empty(CALL_LOG_ENV) {
            self.call_log.path = Some(PathBuf::from(path));
        }
        if let Some(raw) = non_empty(SETTLE_DELAY_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.pipeline.settle_delay_ms = ms,
                Err(_) => {
                    tracing::warn!(value = %raw, "Ignoring non-numeric {}", SETTLE_DELAY_ENV);
                }
            }
        }
    }

    /// Configured call-log path, or `fallback` when none is set.
    pub fn call_log_path(&self, fallback: PathBuf) -> PathBuf {
        self.call_log.path.clone().unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn load_config_defaults_when_file_missing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let config = read_config_file(&temp_dir.path().join("missing.toml")).expect("load");
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.remote.stub_url, DEFAULT_STUB_URL);
        assert_eq!(config.remote.completion_url, DEFAULT_COMPLETION_URL);
        assert_eq!(config.pipeline.settle_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn load_config_parses_partial_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
[remote]
stub_url = "http://localhost:9000/stub/"

[pipeline]
settle_delay_ms = 250

[call_log]
path = "/tmp/calllog.db"
"#,
        )
        .expect("write config");

        let config = read_config_file(&path).expect("load");
        assert_eq!(config.remote.stub_url, "http://localhost:9000/stub/");
        assert_eq!(config.remote.completion_url, DEFAULT_COMPLETION_URL);
        assert_eq!(config.remote.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.pipeline.settle_delay_ms, 250);
        assert_eq!(config.call_log.path, Some(PathBuf::from("/tmp/calllog.db")));
    }

    #[test]
    fn load_config_rejects_malformed_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[pipeline]\nsettle_delay_ms = \"soon\"\n").expect("write");

        let err = read_config_file(&path).unwrap_err();
        assert!(matches!(err, TrackerError::ConfigMalformed { .. }));
    }

    #[test]
    fn overrides_replace_fields_and_skip_garbage() {
        let env: HashMap<&str, &str> = HashMap::from([
            (COMPLETION_URL_ENV, "http://localhost/done/"),
            (CALL_LOG_ENV, "/data/calllog.db"),
            (SETTLE_DELAY_ENV, "not-a-number"),
            (STUB_URL_ENV, "   "),
        ]);
        let mut config = TrackerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.remote.stub_url, DEFAULT_STUB_URL);
        assert_eq!(config.remote.completion_url, "http://localhost/done/");
        assert_eq!(
            config.call_log_path(PathBuf::from("/fallback")),
            PathBuf::from("/data/calllog.db")
        );
        assert_eq!(config.pipeline.settle_delay_ms, DEFAULT_SETTLE_DELAY_MS);
    }
}
