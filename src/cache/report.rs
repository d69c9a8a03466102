//! Detailed Report Module
//!
//! Per-entry diagnostics returned by `get_detailed_report`.

use serde::Serialize;

use crate::cache::entry::EntryMetadata;
use crate::cache::stats::StatsSnapshot;

/// Length of the `top_consumers` and `oldest_entries` lists.
pub const REPORT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryReport {
    pub key: String,
    pub size_bytes: u64,
    pub age_ms: u64,
    pub ttl_remaining_ms: u64,
    pub access_count: u64,
    pub compressed: bool,
    pub metadata: EntryMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedReport {
    pub statistics: StatsSnapshot,
    /// Every live entry, most recently used first
    pub entries: Vec<EntryReport>,
    /// Largest entries by `size_bytes`
    pub top_consumers: Vec<EntryReport>,
    /// Entries with the greatest age
    pub oldest_entries: Vec<EntryReport>,
}

impl DetailedReport {
    pub fn new(statistics: StatsSnapshot, entries: Vec<EntryReport>) -> Self {
        let mut top_consumers = entries.clone();
        top_consumers.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then(a.key.cmp(&b.key)));
        top_consumers.truncate(REPORT_TOP_N);

        let mut oldest_entries = entries.clone();
        oldest_entries.sort_by(|a, b| b.age_ms.cmp(&a.age_ms).then(a.key.cmp(&b.key)));
        oldest_entries.truncate(REPORT_TOP_N);

        Self {
            statistics,
            entries,
            top_consumers,
            oldest_entries,
        }
    }
}
