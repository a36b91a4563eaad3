use calltrack_daemon_protocol::{Method, Request, Response, MAX_REQUEST_BYTES, PROTOCOL_VERSION};
use serde_json::json;
use std::fs;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

struct DaemonGuard {
    child: Child,
}

impl Drop for DaemonGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn spawn_daemon(home: &Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_calltrack-daemon"))
        .env("HOME", home)
        .env_remove("CALLTRACK_DAEMON_SOCKET")
        .env("CALLTRACK_STUB_URL", "http://127.0.0.1:9/")
        .env("CALLTRACK_COMPLETION_URL", "http://127.0.0.1:9/")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn calltrack-daemon")
}

fn socket_path(home: &Path) -> PathBuf {
    home.join(".calltrack").join("daemon.sock")
}

fn can_bind_socket(home: &Path) -> bool {
    let probe_path = home.join("probe.sock");
    match UnixListener::bind(&probe_path) {
        Ok(listener) => {
            drop(listener);
            let _ = fs::remove_file(&probe_path);
            true
        }
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => false,
        Err(_) => true,
    }
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if path.exists() && UnixStream::connect(path).is_ok() {
            return;
        }
        sleep(Duration::from_millis(25));
    }
    panic!("timed out waiting for daemon socket at {}", path.display());
}

fn send_raw_request(socket: &Path, payload: &[u8]) -> Response {
    let mut stream = UnixStream::connect(socket).expect("failed to connect to daemon socket");
    // The daemon may answer before consuming an oversized payload.
    let _ = stream.write_all(payload);
    let _ = stream.flush();
    read_response(&mut stream)
}

fn read_response(stream: &mut UnixStream) -> Response {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).expect("failed to read response");
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if chunk[..n].contains(&b'\n') {
            break;
        }
    }

    let newline_index = buffer.iter().position(|b| *b == b'\n');
    let response_bytes = match newline_index {
        Some(index) => &buffer[..index],
        None => buffer.as_slice(),
    };

    serde_json::from_slice(response_bytes).expect("failed to parse response JSON")
}

fn error_code(response: Response) -> String {
    assert!(!response.ok, "expected an error response");
    response.error.expect("error payload").code
}

fn start(home: &tempfile::TempDir) -> Option<(DaemonGuard, PathBuf)> {
    if !can_bind_socket(home.path()) {
        eprintln!("skipping: sandbox forbids binding unix sockets");
        return None;
    }
    let socket = socket_path(home.path());
    let guard = DaemonGuard {
        child: spawn_daemon(home.path()),
    };
    wait_for_socket(&socket, Duration::from_secs(2));
    Some((guard, socket))
}

#[test]
fn malformed_requests_get_structured_errors() {
    let home = tempfile::tempdir().expect("temp HOME");
    let Some((_guard, socket)) = start(&home) else {
        return;
    };

    assert_eq!(error_code(send_raw_request(&socket, b"\n")), "empty_request");
    assert_eq!(
        error_code(send_raw_request(&socket, b"{not json}\n")),
        "invalid_json"
    );
    assert_eq!(
        error_code(send_raw_request(
            &socket,
            br#"{"protocol_version":1,"method":"reboot"}
"#
        )),
        "invalid_json"
    );

    let mut oversized = vec![b' '; MAX_REQUEST_BYTES + 1];
    oversized.push(b'\n');
    assert_eq!(
        error_code(send_raw_request(&socket, &oversized)),
        "request_too_large"
    );
}

#[test]
fn invalid_params_are_rejected_without_side_effects() {
    let home = tempfile::tempdir().expect("temp HOME");
    let Some((_guard, socket)) = start(&home) else {
        return;
    };

    let send = |method: Method, params: Option<serde_json::Value>| {
        let request = Request {
            protocol_version: PROTOCOL_VERSION,
            method,
            id: Some("hardening".to_string()),
            params,
        };
        let mut payload = serde_json::to_vec(&request).expect("serialize");
        payload.push(b'\n');
        send_raw_request(&socket, &payload)
    };

    assert_eq!(error_code(send(Method::CallState, None)), "invalid_params");
    assert_eq!(
        error_code(send(Method::CallState, Some(json!({"state": "DIALING"})))),
        "invalid_state"
    );
    assert_eq!(
        error_code(send(Method::SubmitTag, Some(json!({"phone_number": ""})))),
        "missing_field"
    );
    assert_eq!(
        error_code(send(
            Method::ManualUpload,
            Some(json!({"phone_number": "1".repeat(40)}))
        )),
        "invalid_phone_number"
    );
    assert_eq!(
        error_code(send(
            Method::SubmitTag,
            Some(json!({"phone_number": "+15559876543"}))
        )),
        "no_pending_prompt"
    );

    let health = send(Method::GetHealth, None);
    let data = health.data.expect("health payload");
    assert_eq!(data["pending_prompts"], 0);
}

#[test]
fn protocol_mismatch_is_reported() {
    let home = tempfile::tempdir().expect("temp HOME");
    let Some((_guard, socket)) = start(&home) else {
        return;
    };

    let payload = format!(
        "{}\n",
        json!({"protocol_version": PROTOCOL_VERSION + 1, "method": "get_health", "id": "v2"})
    );
    let response = send_raw_request(&socket, payload.as_bytes());
    assert_eq!(response.id.as_deref(), Some("v2"));
    assert_eq!(error_code(response), "protocol_mismatch");
}
