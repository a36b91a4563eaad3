//! # calltrack-core
//!
//! Call capture and classification pipeline shared by the daemon and the CLI.
//!
//! ```text
//! idle signal ─► EventTrigger ─(settle delay)─► CallHistory::latest
//!                                                     │
//!                     DedupGuard::admit ◄─────────────┘
//!                             │
//!                        classify ─► LifecycleManager::write_stub ─► RecordWriter
//!                                            │ answered
//!                                            ▼
//!                                   PromptSurface::raise
//!                                            │ user fills form
//!                                            ▼
//!                        TaggingCoordinator::submit ─► write_completion ─► RecordWriter
//! ```
//!
//! ## Design Principles
//!
//! - **Owned state**: the dedup guard and prompt inbox are injected objects, never statics.
//! - **Traits at the edges**: call history, remote writes and prompt presentation
//!   are traits so tests and alternate front ends can swap them.
//! - **Fire-and-forget writes**: writes run on spawned tasks; failures are logged, not retried.
//! - **Weak correlation**: stub and completion share only the phone number.

pub mod call_log;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod lifecycle;
pub mod pipeline;
pub mod prompt;
pub mod record;
pub mod remote;
pub mod storage;
pub mod tagging;
pub mod trigger;
pub mod types;

pub use call_log::{CallHistory, SqliteCallLog};
pub use classify::{carrier_label, classify};
pub use config::{load_config, TrackerConfig};
pub use dedup::DedupGuard;
pub use error::{Result, TrackerError};
pub use lifecycle::{LifecycleManager, WriteHandle};
pub use pipeline::{Pipeline, ProcessedCall};
pub use prompt::{PromptInbox, PromptSurface, TagPrompt};
pub use record::{CompletionRecord, StubRecord, TagFields};
pub use remote::{HttpRecordWriter, RecordWriter};
pub use storage::StorageConfig;
pub use tagging::{
    build_completion, resolve_disposition, CompletionRequest, TagForm, TaggingCoordinator,
    DISPOSITION_OPTIONS,
};
pub use trigger::EventTrigger;
pub use types::*;
