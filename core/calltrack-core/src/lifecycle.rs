//! Record Lifecycle Manager.
//!
//! ```text
//! admitted call ──► stub write (is_completed=false) ──► [answered] raise prompt
//!                                                              │
//! tag form ──────────────► completion write (is_completed=true) ◄┘
//! ```
//!
//! Both writes run on spawned tasks and are not ordered with respect to each
//! other at the remote side; the service reconciles them by phone number only.
//! Failures are logged inside the task and abandoned.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::prompt::{PromptSurface, TagPrompt};
use crate::record::{CompletionRecord, StubRecord, TagFields};
use crate::remote::RecordWriter;
use crate::types::{CallEvent, Disposition};

/// Completion signal for a submitted write. Dropping it does not cancel the write.
pub type WriteHandle = JoinHandle<Result<()>>;

#[derive(Clone)]
pub struct LifecycleManager {
    writer: Arc<dyn RecordWriter>,
    prompts: Arc<dyn PromptSurface>,
}

impl LifecycleManager {
    pub fn new(writer: Arc<dyn RecordWriter>, prompts: Arc<dyn PromptSurface>) -> Self {
        Self { writer, prompts }
    }

    pub fn prompts(&self) -> &Arc<dyn PromptSurface> {
        &self.prompts
    }

    /// Submits the stub for an admitted call. Answered calls also raise a
    /// tag prompt; the prompt does not wait on the write.
    ///
    /// Must be called from within a tokio runtime.
    pub fn write_stub(
        &self,
        event: &CallEvent,
        disposition: Disposition,
        carrier: &str,
    ) -> WriteHandle {
        let handle = self.spawn_stub(StubRecord::for_call(event, disposition, carrier));

        if disposition == Disposition::Answered {
            self.prompts.raise(TagPrompt::for_answered_call(
                &event.phone_number,
                event.duration_seconds,
            ));
        }

        handle
    }

    /// Submits a stub for a number entered by hand. No call log, no dedup, no prompt.
    pub fn write_manual_stub(&self, phone_number: &str) -> WriteHandle {
        self.spawn_stub(StubRecord::manual(phone_number))
    }

    pub fn write_completion(&self, phone_number: &str, fields: TagFields) -> WriteHandle {
        let record = CompletionRecord::new(phone_number, fields);
        let writer = Arc::clone(&self.writer);

        tokio::spawn(async move {
            let result = writer.submit_completion(&record).await;
            match &result {
                Ok(()) => tracing::info!(
                    phone_number = %record.phone_number,
                    status = %record.status,
                    "Completion write accepted"
                ),
                Err(err) => tracing::warn!(
                    phone_number = %record.phone_number,
                    error = %err,
                    "Completion write failed"
                ),
            }
            result
        })
    }

    fn spawn_stub(&self, record: StubRecord) -> WriteHandle {
        let writer = Arc::clone(&self.writer);

        tokio::spawn(async move {
            let result = writer.submit_stub(&record).await;
            match &result {
                Ok(()) => tracing::info!(
                    phone_number = %record.phone_number,
                    status = %record.status,
                    duration = record.duration,
                    "Stub write accepted"
                ),
                Err(err) => tracing::warn!(
                    phone_number = %record.phone_number,
                    error = %err,
                    "Stub write failed"
                ),
            }
            result
        })
    }
}
