//! Dedup Guard: remembers the last admitted call-log timestamp.
//!
//! The same physical call can produce several idle signals, and their delayed
//! reads may race. Keying on the call-log timestamp (stable per call) under a
//! single lock means only one of them ever reaches the stub write.

use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct DedupGuard {
    last_processed: Mutex<Option<i64>>,
}

impl DedupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `timestamp` if it differs from the last
    /// admitted value; returns `false` without mutation otherwise.
    pub fn admit(&self, timestamp: i64) -> bool {
        let mut last = self
            .last_processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last == Some(timestamp) {
            return false;
        }
        *last = Some(timestamp);
        true
    }

    pub fn last_processed(&self) -> Option<i64> {
        *self
            .last_processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self) {
        *self
            .last_processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
