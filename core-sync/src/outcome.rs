//! Aggregated result of a sync pass.

use serde::{Deserialize, Serialize};

/// Counters shared by every layer synced in one run.
///
/// Layers add to the counters; the engine only reads them to build the
/// summary. A run succeeded when every error counter is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub io_errors: u64,
    pub parse_errors: u64,
    pub auth_errors: u64,
    pub conflict_errors: u64,
    pub inserted_count: u64,
    pub updated_count: u64,
    pub deleted_count: u64,
    pub server_entry_count: u64,
    pub skipped_count: u64,
}

impl SyncOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.io_errors > 0
            || self.parse_errors > 0
            || self.auth_errors > 0
            || self.conflict_errors > 0
    }

    /// Labelled counters in report order
    pub fn categories(&self) -> [(&'static str, u64); 9] {
        [
            ("I/O errors", self.io_errors),
            ("Parse errors", self.parse_errors),
            ("Authentication errors", self.auth_errors),
            ("Conflicts", self.conflict_errors),
            ("Inserted", self.inserted_count),
            ("Updated", self.updated_count),
            ("Deleted", self.deleted_count),
            ("Server entries", self.server_entry_count),
            ("Skipped", self.skipped_count),
        ]
    }

    /// One `label: count` line per non-zero counter. Empty when nothing happened.
    pub fn summary(&self) -> String {
        self.categories()
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(label, count)| format!("{}: {}", label, count))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn merge(&mut self, other: &SyncOutcome) {
        self.io_errors += other.io_errors;
        self.parse_errors += other.parse_errors;
        self.auth_errors += other.auth_errors;
        self.conflict_errors += other.conflict_errors;
        self.inserted_count += other.inserted_count;
        self.updated_count += other.updated_count;
        self.deleted_count += other.deleted_count;
        self.server_entry_count += other.server_entry_count;
        self.skipped_count += other.skipped_count;
    }
}
