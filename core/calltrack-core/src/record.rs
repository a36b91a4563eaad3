//! Request bodies for the remote record service.
//!
//! `is_completed` has no setter: a stub always serializes `false` and a
//! completion always serializes `true`, so a record can never regress.

use serde::Serialize;

use crate::types::{CallEvent, CallStatus, CallType, Disposition};

/// First write for a call: auto-generated right after the call ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StubRecord {
    pub phone_number: String,
    pub status: CallStatus,
    pub call_type: CallType,
    pub duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sim_slot: Option<String>,
    is_completed: bool,
}

impl StubRecord {
    pub fn for_call(event: &CallEvent, disposition: Disposition, carrier: &str) -> Self {
        Self {
            phone_number: event.phone_number.clone(),
            status: disposition.default_status(),
            call_type: disposition.call_type(),
            duration: event.duration_seconds,
            sim_slot: Some(carrier.to_string()),
            is_completed: false,
        }
    }

    /// Stub for a number supplied directly rather than read from the call log.
    pub fn manual(phone_number: &str) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            status: CallStatus::FollowUp,
            call_type: CallType::Incoming,
            duration: 0,
            sim_slot: None,
            is_completed: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }
}

/// Human-entered tagging metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFields {
    pub status: CallStatus,
    pub name: String,
    pub address: String,
    pub remarks: String,
}

/// Second write for an answered call. Correlated with the stub by phone number only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRecord {
    pub phone_number: String,
    pub name: String,
    pub address: String,
    pub remarks: String,
    pub status: CallStatus,
    is_completed: bool,
}

impl CompletionRecord {
    pub fn new(phone_number: &str, fields: TagFields) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            name: fields.name,
            address: fields.address,
            remarks: fields.remarks,
            status: fields.status,
            is_completed: true,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missed_stub_body() {
        let event = CallEvent {
            phone_number: "+15551234567".to_string(),
            duration_seconds: 0,
            timestamp: 1000,
            carrier_slot: None,
        };
        let stub = StubRecord::for_call(&event, Disposition::Missed, "UNKNOWN");
        assert_eq!(
            serde_json::to_value(&stub).unwrap(),
            json!({
                "phone_number": "+15551234567",
                "status": "missed",
                "call_type": "missed",
                "duration": 0,
                "sim_slot": "UNKNOWN",
                "is_completed": false
            })
        );
    }

    #[test]
    fn manual_stub_omits_sim_slot() {
        let stub = StubRecord::manual("+15550001111");
        let body = serde_json::to_value(&stub).unwrap();
        assert_eq!(body["status"], "follow_up");
        assert_eq!(body["call_type"], "incoming");
        assert_eq!(body["duration"], 0);
        assert_eq!(body["is_completed"], false);
        assert!(body.get("sim_slot").is_none());
    }

    #[test]
    fn completion_body_is_completed() {
        let record = CompletionRecord::new(
            "+15559876543",
            TagFields {
                status: CallStatus::ExistingClient,
                name: "Acme Corp".to_string(),
                address: String::new(),
                remarks: "renewal".to_string(),
            },
        );
        assert!(record.is_completed());
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "phone_number": "+15559876543",
                "name": "Acme Corp",
                "address": "",
                "remarks": "renewal",
                "status": "existing_client",
                "is_completed": true
            })
        );
    }
}
