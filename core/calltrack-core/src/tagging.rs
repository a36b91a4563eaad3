//! Tagging Coordinator.
//!
//! Turns a filled-in tag form into the completion write for a pending prompt.
//! Dispositions come from a closed set; anything unrecognised falls back to
//! `follow_up`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::lifecycle::LifecycleManager;
use crate::prompt::TagPrompt;
use crate::record::TagFields;
use crate::types::CallStatus;

/// Human-readable label → canonical status code, in display order.
pub const DISPOSITION_OPTIONS: [(&str, CallStatus); 4] = [
    ("Follow Up", CallStatus::FollowUp),
    ("Junk", CallStatus::Junk),
    ("Lead Stage", CallStatus::LeadStage),
    ("Existing Client", CallStatus::ExistingClient),
];

const DEFAULT_DISPOSITION: CallStatus = CallStatus::FollowUp;

/// Accepts either the label or the code, case-insensitively.
pub fn resolve_disposition(selected: Option<&str>) -> CallStatus {
    let selected = match selected.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value,
        None => return DEFAULT_DISPOSITION,
    };

    DISPOSITION_OPTIONS
        .iter()
        .find(|(label, status)| {
            label.eq_ignore_ascii_case(selected) || status.as_str().eq_ignore_ascii_case(selected)
        })
        .map(|(_, status)| *status)
        .unwrap_or(DEFAULT_DISPOSITION)
}

/// Free-text fields as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagForm {
    #[serde(default)]
    pub disposition: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub phone_number: String,
    pub fields: TagFields,
}

pub fn build_completion(prompt: &TagPrompt, form: &TagForm) -> CompletionRequest {
    CompletionRequest {
        phone_number: prompt.phone_number.clone(),
        fields: TagFields {
            status: resolve_disposition(form.disposition.as_deref()),
            name: form.name.clone(),
            address: form.address.clone(),
            remarks: form.remarks.clone(),
        },
    }
}

#[derive(Clone)]
pub struct TaggingCoordinator {
    lifecycle: LifecycleManager,
}

impl TaggingCoordinator {
    pub fn new(lifecycle: LifecycleManager) -> Self {
        Self { lifecycle }
    }

    /// Claims the pending prompt on `phone_number`, sends its completion write
    /// and waits for it. While the write is in flight the prompt is held by this
    /// call, so a concurrent submission for the same prompt is refused. On
    /// failure the prompt goes back unless a newer call has replaced it.
    pub async fn submit(&self, phone_number: &str, form: &TagForm) -> Result<CompletionRequest> {
        let prompts = self.lifecycle.prompts();
        let prompt = prompts
            .take(phone_number)
            .ok_or_else(|| TrackerError::NoPendingPrompt {
                phone_number: phone_number.to_string(),
            })?;

        let request = build_completion(&prompt, form);
        let outcome = match self
            .lifecycle
            .write_completion(&request.phone_number, request.fields.clone())
            .await
        {
            Ok(result) => result,
            Err(join_err) => Err(join_err.into()),
        };

        if let Err(err) = outcome {
            if !prompts.restore(prompt) {
                tracing::debug!(
                    phone_number = %request.phone_number,
                    "Newer prompt raised during submission; keeping it"
                );
            }
            return Err(err);
        }

        tracing::debug!(phone_number = %request.phone_number, "Tagging session closed");
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CallType;
    use chrono::Utc;

    fn prompt() -> TagPrompt {
        TagPrompt {
            phone_number: "+15559876543".to_string(),
            duration_seconds: 42,
            call_type: CallType::Incoming,
            raised_at: Utc::now(),
        }
    }

    #[test]
    fn resolves_labels_and_codes() {
        assert_eq!(
            resolve_disposition(Some("Existing Client")),
            CallStatus::ExistingClient
        );
        assert_eq!(
            resolve_disposition(Some("existing_client")),
            CallStatus::ExistingClient
        );
        assert_eq!(resolve_disposition(Some("JUNK")), CallStatus::Junk);
        assert_eq!(resolve_disposition(Some("lead stage")), CallStatus::LeadStage);
    }

    #[test]
    fn unknown_or_missing_selection_defaults_to_follow_up() {
        assert_eq!(resolve_disposition(None), CallStatus::FollowUp);
        assert_eq!(resolve_disposition(Some("  ")), CallStatus::FollowUp);
        assert_eq!(resolve_disposition(Some("vip")), CallStatus::FollowUp);
        // `missed` is a stub default, not a human choice.
        assert_eq!(resolve_disposition(Some("missed")), CallStatus::FollowUp);
    }

    #[test]
    fn build_completion_uses_prompt_number() {
        let form = TagForm {
            disposition: Some("existing_client".to_string()),
            name: "Acme Corp".to_string(),
            ..TagForm::default()
        };
        let request = build_completion(&prompt(), &form);
        assert_eq!(request.phone_number, "+15559876543");
        assert_eq!(request.fields.status, CallStatus::ExistingClient);
        assert_eq!(request.fields.name, "Acme Corp");
        assert_eq!(request.fields.address, "");
    }
}
