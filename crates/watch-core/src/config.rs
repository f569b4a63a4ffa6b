//! Watcher configuration

use serde::{Deserialize, Serialize};

/// Configuration for a [`PassiveWatcher`](crate::PassiveWatcher)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Keep a per-property history of every recorded write
    pub log_history: bool,
    /// Record the writes that seed a watcher from a snapshot
    pub record_seed: bool,
}

impl WatchConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With history logging
    #[inline]
    #[must_use]
    pub fn with_history(mut self, log_history: bool) -> Self {
        self.log_history = log_history;
        self
    }

    /// With seed recording
    #[inline]
    #[must_use]
    pub fn with_record_seed(mut self, record_seed: bool) -> Self {
        self.record_seed = record_seed;
        self
    }
}
