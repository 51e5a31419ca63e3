//! Core types for the link store.
//!
//! The serialized shapes here are wire formats: the snapshot file is a
//! `StoreState` and each journal line is a `LogEntry`. Field names are part
//! of the on-disk contract and must not change without a migration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One shortened link: the target URL and how many times it was resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub original_url: String,

    #[serde(default)]
    pub clicks: u64,
}

impl UrlRecord {
    /// A fresh record with zero clicks.
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            clicks: 0,
        }
    }
}

/// The complete in-memory state: short key -> record, plus the last issued
/// counter value.
///
/// `current_id` is monotonically non-decreasing for the life of the process
/// and across restarts; recovery never lets it move backward.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub urls: HashMap<String, UrlRecord>,
    pub current_id: u64,
}

/// One committed mutation, serialized as a single journal line.
///
/// Carries a point-in-time copy of the key's record, not a delta. Replaying
/// entries for the same key in file order and keeping the last one
/// reproduces the key's final record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub key: String,
    pub data: UrlRecord,

    /// Counter value observed at the moment the mutation was applied.
    pub current_id: u64,
}

/// Aggregate store statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreStats {
    pub url_count: usize,
    pub current_id: u64,
    pub total_clicks: u64,
}
