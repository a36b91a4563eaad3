//! One pass of the capture pipeline:
//! read latest call → dedup → classify → stub write (+ prompt when answered).

use std::sync::Arc;

use crate::call_log::CallHistory;
use crate::classify::{carrier_label, classify};
use crate::dedup::DedupGuard;
use crate::error::{Result, TrackerError};
use crate::lifecycle::{LifecycleManager, WriteHandle};
use crate::types::{CallEvent, Disposition};

/// A call that passed the dedup guard and had its stub write submitted.
#[derive(Debug)]
pub struct ProcessedCall {
    pub event: CallEvent,
    pub disposition: Disposition,
    pub carrier: String,
    pub stub_write: WriteHandle,
}

#[derive(Clone)]
pub struct Pipeline {
    history: Arc<dyn CallHistory>,
    guard: Arc<DedupGuard>,
    lifecycle: LifecycleManager,
}

impl Pipeline {
    pub fn new(
        history: Arc<dyn CallHistory>,
        guard: Arc<DedupGuard>,
        lifecycle: LifecycleManager,
    ) -> Self {
        Self {
            history,
            guard,
            lifecycle,
        }
    }

    pub fn guard(&self) -> &Arc<DedupGuard> {
        &self.guard
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub async fn run_once(&self) -> Result<ProcessedCall> {
        let history = Arc::clone(&self.history);
        let event = tokio::task::spawn_blocking(move || history.latest()).await??;

        tracing::debug!(
            number = %event.phone_number,
            duration = event.duration_seconds,
            timestamp = event.timestamp,
            sim = ?event.carrier_slot,
            "Read latest call"
        );

        if !self.guard.admit(event.timestamp) {
            return Err(TrackerError::DuplicateEvent {
                timestamp: event.timestamp,
            });
        }

        let disposition = classify(event.duration_seconds);
        let carrier = carrier_label(event.carrier_slot.as_deref());
        let stub_write = self.lifecycle.write_stub(&event, disposition, &carrier);

        Ok(ProcessedCall {
            event,
            disposition,
            carrier,
            stub_write,
        })
    }

    /// Runs one pass and logs the outcome. Nothing is surfaced to the caller
    /// beyond the processed call itself.
    pub async fn run_and_log(&self) -> Option<ProcessedCall> {
        match self.run_once().await {
            Ok(call) => {
                tracing::info!(
                    number = %call.event.phone_number,
                    duration = call.event.duration_seconds,
                    disposition = ?call.disposition,
                    sim = %call.carrier,
                    "Call processed"
                );
                Some(call)
            }
            Err(TrackerError::DuplicateEvent { timestamp }) => {
                tracing::debug!(timestamp, "Skipping already processed call");
                None
            }
            Err(TrackerError::NoRecordsAvailable) => {
                tracing::info!("Call history is empty; nothing to record");
                None
            }
            Err(err @ TrackerError::MalformedRecord { .. }) => {
                tracing::warn!(error = %err, "Skipping malformed call-log row");
                None
            }
            Err(err) => {
                tracing::error!(error = %err, code = err.code(), "Call pipeline failed");
                None
            }
        }
    }
}
