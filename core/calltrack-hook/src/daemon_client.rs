//! Client helper for talking to the calltrack daemon.
//!
//! The daemon owns all pipeline state; this side only frames requests and
//! reports what came back. Failures are surfaced to the caller.

use calltrack_core::{StorageConfig, TagPrompt};
use calltrack_daemon_protocol::{
    CallStateParams, ManualUploadParams, Method, Request, Response, TagSubmission,
    MAX_REQUEST_BYTES,
};
use chrono::Utc;
use rand::RngCore;
use serde_json::Value;
use std::env;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const SOCKET_ENV: &str = "CALLTRACK_DAEMON_SOCKET";
const READ_TIMEOUT_MS: u64 = 600;
// Tag submission waits on the remote completion write.
const SUBMIT_READ_TIMEOUT_MS: u64 = 15_000;
const WRITE_TIMEOUT_MS: u64 = 600;
const RETRY_DELAY_MS: u64 = 50;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Daemon unavailable: {0}")]
    Unavailable(String),

    #[error("Daemon connection failed: {0}")]
    Transport(String),

    #[error("Daemon rejected request ({code}): {message}")]
    Daemon { code: String, message: String },

    #[error("Unexpected daemon response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Daemon { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// When a failed attempt may be sent again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    /// Replays are harmless (the daemon dedups call signals).
    Always,
    /// Only when the request never reached the daemon.
    UndeliveredOnly,
}

/// Forwards a telephony state. Returns whether the daemon scheduled a pass.
pub fn send_call_state(state: &str) -> Result<bool, ClientError> {
    let params = CallStateParams {
        state: state.to_string(),
        recorded_at: Some(Utc::now().to_rfc3339()),
    };
    let data = call(
        Method::CallState,
        "call-state",
        Some(to_params(&params)?),
        Retry::Always,
        READ_TIMEOUT_MS,
    )?;
    Ok(data
        .get("scheduled")
        .and_then(Value::as_bool)
        .unwrap_or(false))
}

pub fn list_prompts() -> Result<Vec<TagPrompt>, ClientError> {
    let data = call(
        Method::ListPrompts,
        "prompts",
        None,
        Retry::Always,
        READ_TIMEOUT_MS,
    )?;
    serde_json::from_value(data)
        .map_err(|err| ClientError::InvalidResponse(format!("prompt list: {}", err)))
}

/// Submits a tag form and waits for the completion write to land.
pub fn submit_tag(submission: &TagSubmission) -> Result<Value, ClientError> {
    call(
        Method::SubmitTag,
        "tag",
        Some(to_params(submission)?),
        Retry::UndeliveredOnly,
        SUBMIT_READ_TIMEOUT_MS,
    )
}

pub fn manual_upload(phone_number: &str) -> Result<Value, ClientError> {
    let params = ManualUploadParams {
        phone_number: phone_number.to_string(),
    };
    call(
        Method::ManualUpload,
        "upload",
        Some(to_params(&params)?),
        Retry::UndeliveredOnly,
        READ_TIMEOUT_MS,
    )
}

pub fn daemon_health() -> Result<Value, ClientError> {
    call(
        Method::GetHealth,
        "health-check",
        None,
        Retry::Always,
        READ_TIMEOUT_MS,
    )
}

fn socket_path() -> Result<PathBuf, ClientError> {
    if let Ok(path) = env::var(SOCKET_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    StorageConfig::from_home()
        .map(|storage| storage.socket_file())
        .map_err(|err| ClientError::Unavailable(err.to_string()))
}

fn to_params<T: serde::Serialize>(params: &T) -> Result<Value, ClientError> {
    serde_json::to_value(params)
        .map_err(|err| ClientError::InvalidResponse(format!("Failed to serialize params: {}", err)))
}

fn call(
    method: Method,
    label: &str,
    params: Option<Value>,
    retry: Retry,
    read_timeout_ms: u64,
) -> Result<Value, ClientError> {
    // One id for both attempts so the daemon logs can pair a replay with its original.
    let request_id = make_request_id(label);
    let build = || Request::new(method, Some(request_id.clone()), params.clone());

    let response = match send_request(build(), read_timeout_ms).and_then(into_data) {
        Ok(data) => return Ok(data),
        Err(err) => {
            let retryable = match retry {
                Retry::Always => true,
                Retry::UndeliveredOnly => matches!(err, ClientError::Unavailable(_)),
            };
            if !retryable {
                return Err(err);
            }
            tracing::warn!(error = %err, "Failed to send {} request to daemon", label);
            std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
            send_request(build(), read_timeout_ms)
        }
    };

    response.and_then(into_data).map_err(|retry_err| {
        tracing::warn!(
            error = %retry_err,
            "Retry failed sending {} request to daemon",
            label
        );
        retry_err
    })
}

fn into_data(response: Response) -> Result<Value, ClientError> {
    if response.ok {
        return Ok(response.data.unwrap_or(Value::Null));
    }
    Err(match response.error {
        Some(err) => ClientError::Daemon {
            code: err.code,
            message: err.message,
        },
        None => ClientError::InvalidResponse("error response without details".to_string()),
    })
}

fn send_request(request: Request, read_timeout_ms: u64) -> Result<Response, ClientError> {
    let socket = socket_path()?;
    let mut stream = UnixStream::connect(&socket).map_err(|err| {
        ClientError::Unavailable(format!("Failed to connect to {}: {}", socket.display(), err))
    })?;
    let _ = stream.set_read_timeout(Some(Duration::from_millis(read_timeout_ms)));
    let _ = stream.set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)));

    serde_json::to_writer(&mut stream, &request)
        .map_err(|err| ClientError::Transport(format!("Failed to write request: {}", err)))?;
    stream
        .write_all(b"\n")
        .map_err(|err| ClientError::Transport(format!("Failed to flush request: {}", err)))?;
    stream.flush().ok();

    read_response(&mut stream)
}

fn read_response(stream: &mut UnixStream) -> Result<Response, ClientError> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_REQUEST_BYTES {
                    return Err(ClientError::InvalidResponse(
                        "Response exceeded maximum size".to_string(),
                    ));
                }
                if chunk[..n].contains(&b'\n') {
                    break;
                }
            }
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                return Err(ClientError::Transport(
                    "Timed out waiting for daemon response".to_string(),
                ));
            }
            Err(err) => {
                return Err(ClientError::Transport(format!(
                    "Failed to read response: {}",
                    err
                )))
            }
        }
    }

    let newline_index = buffer.iter().position(|b| *b == b'\n');
    let response_bytes = match newline_index {
        Some(index) => &buffer[..index],
        None => buffer.as_slice(),
    };

    if response_bytes.is_empty() {
        return Err(ClientError::Transport(
            "Daemon response was empty".to_string(),
        ));
    }

    serde_json::from_slice(response_bytes)
        .map_err(|err| ClientError::InvalidResponse(format!("Failed to parse JSON: {}", err)))
}

fn make_request_id(label: &str) -> String {
    let mut random = rand::thread_rng();
    format!(
        "{}-{}-{}-{:x}",
        label,
        Utc::now().timestamp_millis(),
        std::process::id(),
        random.next_u64()
    )
}
