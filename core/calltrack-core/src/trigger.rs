//! Event Trigger.
//!
//! The call-log row for a just-ended call is not guaranteed to be committed
//! when the idle signal fires, so each idle transition schedules one pipeline
//! pass after a settle delay. Ringing and offhook are ignored. Repeated idle
//! signals each schedule a pass; the dedup guard sorts them out.

use std::time::Duration;
use tokio::task::JoinHandle;

use crate::pipeline::{Pipeline, ProcessedCall};
use crate::types::CallState;

pub struct EventTrigger {
    pipeline: Pipeline,
    settle_delay: Duration,
}

impl EventTrigger {
    pub fn new(pipeline: Pipeline, settle_delay: Duration) -> Self {
        Self {
            pipeline,
            settle_delay,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns immediately. For `Idle`, the returned handle resolves after the
    /// delayed pass has run.
    pub fn on_call_state(&self, state: CallState) -> Option<JoinHandle<Option<ProcessedCall>>> {
        if state != CallState::Idle {
            tracing::debug!(state = state.as_str(), "Ignoring non-idle call state");
            return None;
        }

        let pipeline = self.pipeline.clone();
        let delay = self.settle_delay;
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Idle transition; read scheduled");

        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pipeline.run_and_log().await
        }))
    }
}
