//! calltrack daemon entrypoint.
//!
//! A single long-lived process that owns the dedup guard and the prompt inbox.
//! Telephony hooks and the `calltrack` CLI reach it over a Unix socket; each
//! connection carries one newline-delimited JSON request and gets one response.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fs_err as fs;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use calltrack_core::{
    load_config, CallState, PromptSurface, StorageConfig, TagForm, TrackerConfig,
};
use calltrack_daemon_protocol::{
    parse_call_state, parse_manual_upload, parse_tag_submission, ErrorInfo, Method, Request,
    Response, MAX_REQUEST_BYTES, PROTOCOL_VERSION,
};

mod state;

use state::SharedState;

const SOCKET_ENV: &str = "CALLTRACK_DAEMON_SOCKET";
const READ_TIMEOUT_SECS: u64 = 2;
const READ_CHUNK_SIZE: usize = 4096;

#[tokio::main]
async fn main() {
    init_logging();

    let storage = match StorageConfig::from_home() {
        Ok(storage) => storage,
        Err(err) => {
            error!(error = %err, "Failed to resolve calltrack storage root");
            std::process::exit(1);
        }
    };

    let config = match load_config(&storage.config_file()) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "Failed to load config; using defaults");
            let mut config = TrackerConfig::default();
            config.apply_overrides(|key| env::var(key).ok());
            config
        }
    };

    let socket_path = daemon_socket_path(&storage);

    if let Err(err) = prepare_socket_dir(&socket_path) {
        error!(error = %err, "Failed to prepare daemon socket directory");
        std::process::exit(1);
    }

    if let Err(err) = remove_existing_socket(&socket_path) {
        error!(error = %err, path = %socket_path.display(), "Failed to remove existing socket");
        std::process::exit(1);
    }

    let shared_state = match SharedState::from_config(&config, &storage) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            error!(error = %err, code = err.code(), "Failed to initialize call pipeline");
            std::process::exit(1);
        }
    };

    let listener = match UnixListener::bind(&socket_path) {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, path = %socket_path.display(), "Failed to bind daemon socket");
            std::process::exit(1);
        }
    };

    info!(path = %socket_path.display(), "calltrack daemon started");

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let state = Arc::clone(&shared_state);
                    tokio::spawn(handle_connection(stream, state));
                }
                Err(err) => {
                    warn!(error = %err, "Failed to accept daemon connection");
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    if let Err(err) = remove_existing_socket(&socket_path) {
        warn!(error = %err, "Failed to clean up daemon socket");
    }
}

fn init_logging() {
    let debug_enabled = env::var("CALLTRACK_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn daemon_socket_path(storage: &StorageConfig) -> PathBuf {
    match env::var(SOCKET_ENV) {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => storage.socket_file(),
    }
}

fn prepare_socket_dir(socket_path: &Path) -> Result<(), String> {
    let parent = socket_path
        .parent()
        .ok_or_else(|| "Socket path has no parent".to_string())?;
    fs::create_dir_all(parent).map_err(|err| format!("Failed to create socket directory: {}", err))
}

fn remove_existing_socket(socket_path: &Path) -> Result<(), String> {
    if socket_path.exists() {
        fs::remove_file(socket_path)
            .map_err(|err| format!("Failed to remove existing socket: {}", err))?;
    }
    Ok(())
}

async fn handle_connection(mut stream: UnixStream, state: Arc<SharedState>) {
    let request = match read_request(&mut stream).await {
        Ok(request) => request,
        Err(err) => {
            warn!(code = %err.code, message = %err.message, "Failed to read request");
            let response = Response::error_with_info(None, err);
            let _ = write_response(&mut stream, response).await;
            return;
        }
    };

    tracing::debug!(method = ?request.method, id = ?request.id, "Daemon request received");
    let response = handle_request(request, &state).await;
    let _ = write_response(&mut stream, response).await;
}

async fn read_request(stream: &mut UnixStream) -> Result<Request, ErrorInfo> {
    let buffer = tokio::time::timeout(
        Duration::from_secs(READ_TIMEOUT_SECS),
        read_until_newline(stream),
    )
    .await
    .map_err(|_| ErrorInfo::new("read_timeout", "request timed out"))??;

    parse_request(&buffer)
}

async fn read_until_newline(stream: &mut UnixStream) -> Result<Vec<u8>, ErrorInfo> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_REQUEST_BYTES {
                    return Err(ErrorInfo::new(
                        "request_too_large",
                        "request exceeded maximum size",
                    ));
                }
                if chunk[..n].contains(&b'\n') {
                    break;
                }
            }
            Err(err) => {
                return Err(ErrorInfo::new(
                    "read_error",
                    format!("failed to read request: {}", err),
                ));
            }
        }
    }

    Ok(buffer)
}

fn parse_request(buffer: &[u8]) -> Result<Request, ErrorInfo> {
    let request_bytes = match buffer.iter().position(|b| *b == b'\n') {
        Some(index) => {
            let trailing = &buffer[index + 1..];
            if trailing.iter().any(|b| !b.is_ascii_whitespace()) {
                warn!("Extra bytes detected after newline; ignoring trailing data");
            }
            &buffer[..index]
        }
        None => buffer,
    };

    if request_bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ErrorInfo::new("empty_request", "request body was empty"));
    }

    serde_json::from_slice(request_bytes).map_err(|err| {
        ErrorInfo::new(
            "invalid_json",
            format!("request was not valid JSON: {}", err),
        )
    })
}

async fn handle_request(request: Request, state: &SharedState) -> Response {
    if request.protocol_version != PROTOCOL_VERSION {
        return Response::error(
            request.id,
            "protocol_mismatch",
            "unsupported protocol version",
        );
    }

    match request.method {
        Method::GetHealth => Response::ok(
            request.id,
            json!({
                "status": "ok",
                "pid": std::process::id(),
                "version": env!("CARGO_PKG_VERSION"),
                "protocol_version": PROTOCOL_VERSION,
                "last_processed_timestamp": state.last_processed(),
                "pending_prompts": state.pending_prompt_count(),
                "settle_delay_ms": state.settle_delay().as_millis() as u64,
            }),
        ),
        Method::CallState => handle_call_state(request, state),
        Method::ListPrompts => {
            let prompts = state.prompts().list();
            tracing::debug!(prompts = prompts.len(), "Prompt snapshot");
            match serde_json::to_value(prompts) {
                Ok(value) => Response::ok(request.id, value),
                Err(err) => Response::error(
                    request.id,
                    "serialization_error",
                    format!("Failed to serialize prompts: {}", err),
                ),
            }
        }
        Method::SubmitTag => handle_submit_tag(request, state).await,
        Method::ManualUpload => handle_manual_upload(request, state),
    }
}

fn handle_call_state(request: Request, state: &SharedState) -> Response {
    let params = match request.params {
        Some(params) => params,
        None => return Response::error(request.id, "invalid_params", "state is required"),
    };
    let parsed = match parse_call_state(params) {
        Ok(parsed) => parsed,
        Err(err) => return Response::error_with_info(request.id, err),
    };
    let call_state = match CallState::parse(&parsed.state) {
        Some(call_state) => call_state,
        None => {
            return Response::error(
                request.id,
                "invalid_state",
                format!("unrecognised call state: {}", parsed.state),
            )
        }
    };

    info!(
        state = call_state.as_str(),
        recorded_at = ?parsed.recorded_at,
        "Received call state"
    );

    // The pass runs detached; the caller only learns whether one was scheduled.
    let scheduled = state.trigger().on_call_state(call_state).is_some();

    Response::ok(
        request.id,
        json!({ "accepted": true, "scheduled": scheduled }),
    )
}

async fn handle_submit_tag(request: Request, state: &SharedState) -> Response {
    let params = match request.params {
        Some(params) => params,
        None => return Response::error(request.id, "invalid_params", "phone_number is required"),
    };
    let submission = match parse_tag_submission(params) {
        Ok(submission) => submission,
        Err(err) => return Response::error_with_info(request.id, err),
    };

    let form = TagForm {
        disposition: submission.disposition,
        name: submission.name,
        address: submission.address,
        remarks: submission.remarks,
    };

    match state
        .coordinator()
        .submit(&submission.phone_number, &form)
        .await
    {
        Ok(completed) => Response::ok(
            request.id,
            json!({
                "completed": true,
                "phone_number": completed.phone_number,
                "status": completed.fields.status.as_str(),
            }),
        ),
        Err(err) => {
            warn!(
                phone_number = %submission.phone_number,
                error = %err,
                "Tag submission failed"
            );
            Response::error(request.id, err.code(), err.to_string())
        }
    }
}

fn handle_manual_upload(request: Request, state: &SharedState) -> Response {
    let params = match request.params {
        Some(params) => params,
        None => return Response::error(request.id, "invalid_params", "phone_number is required"),
    };
    let parsed = match parse_manual_upload(params) {
        Ok(parsed) => parsed,
        Err(err) => return Response::error_with_info(request.id, err),
    };

    info!(phone_number = %parsed.phone_number, "Manual upload requested");
    drop(state.lifecycle().write_manual_stub(&parsed.phone_number));

    Response::ok(
        request.id,
        json!({ "accepted": true, "phone_number": parsed.phone_number }),
    )
}

async fn write_response(stream: &mut UnixStream, response: Response) -> std::io::Result<()> {
    let mut payload = serde_json::to_vec(&response)?;
    payload.push(b'\n');
    stream.write_all(&payload).await?;
    stream.flush().await?;
    Ok(())
}
