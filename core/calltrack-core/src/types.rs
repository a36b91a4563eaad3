//! Core types shared by the daemon and the CLI.
//!
//! Wire names (`snake_case`) match what the remote record service expects, so
//! these enums serialize straight into request bodies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Carrier label used when the call log has no slot information.
pub const UNKNOWN_CARRIER: &str = "UNKNOWN";

// ═══════════════════════════════════════════════════════════════════════════════
// Call Events
// ═══════════════════════════════════════════════════════════════════════════════

/// The most recent call-log row, read once per idle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEvent {
    pub phone_number: String,
    pub duration_seconds: u64,
    /// Epoch millis of the call. Stable per physical call, so it doubles as the dedup key.
    pub timestamp: i64,
    #[serde(default)]
    pub carrier_slot: Option<String>,
}

/// Telephony call state as delivered by the platform signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Idle,
    Ringing,
    Offhook,
}

impl CallState {
    /// Parses the platform's state strings (`IDLE`, `RINGING`, `OFFHOOK`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "idle" => Some(CallState::Idle),
            "ringing" => Some(CallState::Ringing),
            "offhook" | "off_hook" => Some(CallState::Offhook),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Ringing => "ringing",
            CallState::Offhook => "offhook",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Classification
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of classifying a completed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Missed,
    Answered,
}

impl Disposition {
    /// Status the stub record starts with before any human tagging.
    pub fn default_status(&self) -> CallStatus {
        match self {
            Disposition::Missed => CallStatus::Missed,
            Disposition::Answered => CallStatus::FollowUp,
        }
    }

    pub fn call_type(&self) -> CallType {
        match self {
            Disposition::Missed => CallType::Missed,
            Disposition::Answered => CallType::Incoming,
        }
    }
}

/// Record status as stored by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Missed,
    FollowUp,
    Junk,
    LeadStage,
    ExistingClient,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Missed => "missed",
            CallStatus::FollowUp => "follow_up",
            CallStatus::Junk => "junk",
            CallStatus::LeadStage => "lead_stage",
            CallStatus::ExistingClient => "existing_client",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Missed,
    Incoming,
}
