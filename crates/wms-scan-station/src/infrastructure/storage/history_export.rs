//! Scan history export.
//!
//! Writes the session's scan history as a pretty-printed JSON array to
//! `scan_history_<YYYY-MM-DD>.json`:
//!
//! ```json
//! [
//!   {
//!     "barcode": "PO-12345",
//!     "timestamp": "2024-03-01T09:15:02.117Z",
//!     "target": null
//!   }
//! ]
//! ```

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::info;

use wms_scan_core::ScanHistory;

/// Error type for history export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize scan history: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write scan history to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Serializes `history` as a two-space-indented JSON array.
///
/// # Errors
///
/// [`ExportError::Json`] if serialization fails.
pub fn history_to_json(history: &ScanHistory) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(history.entries())?)
}

/// `scan_history_2024-03-01.json` for 1 March 2024.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("scan_history_{}.json", date.format("%Y-%m-%d"))
}

/// Writes `history` into `dir` under today's (UTC) export file name and
/// returns the path written.  An existing file for the same day is replaced.
///
/// # Errors
///
/// [`ExportError::Io`] if `dir` cannot be created or the file cannot be
/// written, [`ExportError::Json`] if serialization fails.
pub fn export_history(history: &ScanHistory, dir: &Path) -> Result<PathBuf, ExportError> {
    let json = history_to_json(history)?;

    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(export_file_name(Utc::now().date_naive()));
    std::fs::write(&path, json).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), entries = history.len(), "scan history exported");
    Ok(path)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
