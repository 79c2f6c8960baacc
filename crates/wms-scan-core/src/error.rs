//! Scan error taxonomy and user-facing notifications.
//!
//! None of these errors is fatal: every one of them ends the current scan and
//! returns the station to idle.  What differs is what the user is told and
//! whether the scan was recorded in history:
//!
//! | Error              | Recorded in history | Severity |
//! |--------------------|---------------------|----------|
//! | `InvalidFormat`    | no                  | error    |
//! | `Timeout`          | no                  | warning  |
//! | `Unrecognized`     | yes                 | warning  |
//! | `ServerReported`   | yes                 | error    |
//! | `TransportFailure` | yes                 | error    |

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::barcode::BarcodeKind;

/// Errors that end a scan without a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The buffer failed the length or character-set check.
    #[error("Invalid barcode format")]
    InvalidFormat,

    /// No terminator arrived before the scan timeout elapsed.
    #[error("Scan timeout. Please try again.")]
    Timeout,

    /// The barcode is valid but matches no prefix rule.
    #[error("Barcode type not recognized")]
    Unrecognized,

    /// The lookup endpoint answered with an `error` field.
    #[error("{0}")]
    ServerReported(String),

    /// The lookup request failed at the network or HTTP level.
    #[error("{}", transport_message(.0))]
    TransportFailure(BarcodeKind),
}

fn transport_message(kind: &BarcodeKind) -> &'static str {
    match kind {
        BarcodeKind::PurchaseOrder => "Failed to load PO information",
        BarcodeKind::ItemCode => "Failed to load item information",
        BarcodeKind::SupplierBarcode => "Failed to process supplier barcode",
        BarcodeKind::Unrecognized => "Failed to process barcode",
    }
}

impl ScanError {
    pub fn severity(&self) -> Severity {
        match self {
            ScanError::Timeout | ScanError::Unrecognized => Severity::Warning,
            ScanError::InvalidFormat
            | ScanError::ServerReported(_)
            | ScanError::TransportFailure(_) => Severity::Error,
        }
    }
}

/// Visual severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }
}

impl From<&ScanError> for Notification {
    fn from(err: &ScanError) -> Self {
        Notification::new(err.severity(), err.to_string())
    }
}
