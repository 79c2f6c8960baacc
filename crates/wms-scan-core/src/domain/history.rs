//! In-memory record of validated scans.
//!
//! An entry is appended for every scan that passes validation, whether or not
//! the barcode is later recognised or its lookup succeeds.  Cancelled, timed
//! out, and invalid scans are never recorded.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// One validated scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanHistoryEntry {
    /// The trimmed barcode text.
    pub barcode: String,
    /// When the scan was processed.  Serialised as ISO-8601 UTC with
    /// millisecond precision, e.g. `2024-03-01T09:30:00.123Z`.
    #[serde(serialize_with = "serialize_iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// The target field id when the scan was target-routed.
    pub target: Option<String>,
}

fn serialize_iso_millis<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Ordered, unbounded sequence of [`ScanHistoryEntry`] values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanHistory {
    entries: Vec<ScanHistoryEntry>,
}

impl ScanHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry stamped with the current time.
    pub fn record(&mut self, barcode: impl Into<String>, target: Option<String>) {
        self.push(ScanHistoryEntry {
            barcode: barcode.into(),
            timestamp: Utc::now(),
            target,
        });
    }

    pub fn push(&mut self, entry: ScanHistoryEntry) {
        self.entries.push(entry);
    }

    /// Entries in the order they were recorded.
    pub fn entries(&self) -> &[ScanHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn last(&self) -> Option<&ScanHistoryEntry> {
        self.entries.last()
    }
}
