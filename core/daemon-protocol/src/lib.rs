//! IPC protocol types and validation for calltrack-daemon.
//!
//! Shared by the daemon and the `calltrack` CLI so both sides agree on the
//! schema. One newline-terminated JSON request per connection, answered by one
//! newline-terminated JSON response. The daemon remains the authority on
//! validation.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

const MAX_PHONE_NUMBER_LEN: usize = 32;
const MAX_FIELD_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Method {
    GetHealth,
    /// Telephony signal delivery.
    CallState,
    ListPrompts,
    SubmitTag,
    ManualUpload,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub protocol_version: u32,
    pub method: Method,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(method: Method, id: Option<String>, params: Option<Value>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            method,
            id,
            params,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl Response {
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            ok: true,
            id,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(ErrorInfo::new(code, message)),
        }
    }

    pub fn error_with_info(id: Option<String>, error: ErrorInfo) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(error),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Method parameters
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallStateParams {
    /// Platform state string (`IDLE`, `RINGING`, `OFFHOOK`).
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagSubmission {
    pub phone_number: String,
    /// Label or status code; the daemon defaults unknown values to `follow_up`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualUploadParams {
    pub phone_number: String,
}

pub fn parse_call_state(params: Value) -> Result<CallStateParams, ErrorInfo> {
    let parsed: CallStateParams = parse_params(params, "call_state")?;
    require_text(&parsed.state, "state")?;
    if let Some(recorded_at) = &parsed.recorded_at {
        if DateTime::parse_from_rfc3339(recorded_at).is_err() {
            return Err(ErrorInfo::new(
                "invalid_timestamp",
                "recorded_at must be RFC3339",
            ));
        }
    }
    Ok(parsed)
}

pub fn parse_tag_submission(params: Value) -> Result<TagSubmission, ErrorInfo> {
    let parsed: TagSubmission = parse_params(params, "submit_tag")?;
    require_phone_number(&parsed.phone_number)?;
    for (value, field) in [
        (&parsed.name, "name"),
        (&parsed.address, "address"),
        (&parsed.remarks, "remarks"),
    ] {
        if value.len() > MAX_FIELD_LEN {
            return Err(ErrorInfo::new(
                "field_too_long",
                format!("{} must be {} bytes or fewer", field, MAX_FIELD_LEN),
            ));
        }
    }
    Ok(parsed)
}

pub fn parse_manual_upload(params: Value) -> Result<ManualUploadParams, ErrorInfo> {
    let parsed: ManualUploadParams = parse_params(params, "manual_upload")?;
    require_phone_number(&parsed.phone_number)?;
    Ok(parsed)
}

fn parse_params<T>(params: Value, method: &str) -> Result<T, ErrorInfo>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new(
            "invalid_params",
            format!("{} payload is invalid: {}", method, err),
        )
    })
}

fn require_text(value: &str, field: &str) -> Result<(), ErrorInfo> {
    if value.trim().is_empty() {
        return Err(ErrorInfo::new(
            "missing_field",
            format!("{} is required", field),
        ));
    }
    Ok(())
}

fn require_phone_number(value: &str) -> Result<(), ErrorInfo> {
    require_text(value, "phone_number")?;
    if value.len() > MAX_PHONE_NUMBER_LEN {
        return Err(ErrorInfo::new(
            "invalid_phone_number",
            format!(
                "phone_number must be {} characters or fewer",
                MAX_PHONE_NUMBER_LEN
            ),
        ));
    }
    Ok(())
}
