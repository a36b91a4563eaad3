//! Process-lifetime state owned by the daemon.
//!
//! The dedup guard and the prompt inbox live here for as long as the daemon
//! runs; every connection handler sees the same instances.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use calltrack_core::{
    CallHistory, DedupGuard, EventTrigger, HttpRecordWriter, LifecycleManager, Pipeline,
    PromptInbox, PromptSurface, RecordWriter, SqliteCallLog, StorageConfig, TaggingCoordinator,
    TrackerConfig,
};

pub struct SharedState {
    trigger: EventTrigger,
    coordinator: TaggingCoordinator,
    lifecycle: LifecycleManager,
    prompts: Arc<PromptInbox>,
    settle_delay: Duration,
}

impl SharedState {
    pub fn new(
        history: Arc<dyn CallHistory>,
        writer: Arc<dyn RecordWriter>,
        settle_delay: Duration,
    ) -> Self {
        let prompts = Arc::new(PromptInbox::new());
        let lifecycle = LifecycleManager::new(writer, prompts.clone());
        let pipeline = Pipeline::new(history, Arc::new(DedupGuard::new()), lifecycle.clone());

        Self {
            trigger: EventTrigger::new(pipeline, settle_delay),
            coordinator: TaggingCoordinator::new(lifecycle.clone()),
            lifecycle,
            prompts,
            settle_delay,
        }
    }

    /// Wires the production call log and HTTP writer from config.
    pub fn from_config(
        config: &TrackerConfig,
        storage: &StorageConfig,
    ) -> calltrack_core::Result<Self> {
        let call_log_path: PathBuf = config.call_log_path(storage.default_call_log());
        tracing::info!(
            call_log = %call_log_path.display(),
            stub_url = %config.remote.stub_url,
            completion_url = %config.remote.completion_url,
            settle_delay_ms = config.pipeline.settle_delay_ms,
            "Pipeline configured"
        );

        let writer = HttpRecordWriter::new(&config.remote)?;
        Ok(Self::new(
            Arc::new(SqliteCallLog::new(call_log_path)),
            Arc::new(writer),
            config.pipeline.settle_delay(),
        ))
    }

    pub fn trigger(&self) -> &EventTrigger {
        &self.trigger
    }

    pub fn coordinator(&self) -> &TaggingCoordinator {
        &self.coordinator
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn prompts(&self) -> &PromptInbox {
        &self.prompts
    }

    pub fn last_processed(&self) -> Option<i64> {
        self.trigger.pipeline().guard().last_processed()
    }

    pub fn pending_prompt_count(&self) -> usize {
        self.prompts.list().len()
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }
}
