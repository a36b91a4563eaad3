//! Tag prompts raised for answered calls.
//!
//! The lifecycle manager raises a prompt after an answered call's stub write is
//! submitted; the tagging coordinator only accepts submissions for numbers with
//! a pending prompt. At most one prompt is pending per number: a later call
//! from the same number replaces the earlier prompt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::types::CallType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPrompt {
    pub phone_number: String,
    pub duration_seconds: u64,
    pub call_type: CallType,
    pub raised_at: DateTime<Utc>,
}

impl TagPrompt {
    pub(crate) fn for_answered_call(phone_number: &str, duration_seconds: u64) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            duration_seconds,
            call_type: CallType::Incoming,
            raised_at: Utc::now(),
        }
    }
}

/// Presentation surface for tag prompts.
pub trait PromptSurface: Send + Sync {
    /// Surfaces the prompt and fires the local alert. Fire-and-forget.
    fn raise(&self, prompt: TagPrompt);

    fn pending(&self, phone_number: &str) -> Option<TagPrompt>;

    /// Removes and returns the pending prompt for `phone_number` in one step.
    /// Only one caller can claim a given prompt.
    fn take(&self, phone_number: &str) -> Option<TagPrompt>;

    /// Puts a claimed prompt back unless a newer prompt for the same number was
    /// raised meanwhile. Returns whether it was reinstated.
    fn restore(&self, prompt: TagPrompt) -> bool;

    /// Pending prompts, oldest first.
    fn list(&self) -> Vec<TagPrompt>;
}

/// In-memory prompt store. The alert itself is a structured log event that
/// whatever front end tails the daemon turns into a notification.
///
/// Prompts leave the store only when a tagging submission claims them or a
/// newer call replaces them. An unanswered prompt stays for the life of the
/// process, so the store holds at most one entry per distinct number seen.
#[derive(Debug, Default)]
pub struct PromptInbox {
    prompts: Mutex<HashMap<String, TagPrompt>>,
}

impl PromptInbox {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PromptSurface for PromptInbox {
    fn raise(&self, prompt: TagPrompt) {
        tracing::info!(
            phone_number = %prompt.phone_number,
            duration = prompt.duration_seconds,
            "Call ended; tap to add call details"
        );
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(prompt.phone_number.clone(), prompt);
    }

    fn pending(&self, phone_number: &str) -> Option<TagPrompt> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(phone_number)
            .cloned()
    }

    fn take(&self, phone_number: &str) -> Option<TagPrompt> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(phone_number)
    }

    fn restore(&self, prompt: TagPrompt) -> bool {
        let mut prompts = self.prompts.lock().unwrap_or_else(PoisonError::into_inner);
        match prompts.entry(prompt.phone_number.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(prompt);
                true
            }
        }
    }

    fn list(&self) -> Vec<TagPrompt> {
        let mut prompts: Vec<TagPrompt> = self
            .prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        prompts.sort_by(|a, b| {
            a.raised_at
                .cmp(&b.raised_at)
                .then_with(|| a.phone_number.cmp(&b.phone_number))
        });
        prompts
    }
}
