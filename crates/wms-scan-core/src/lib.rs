//! # wms-scan-core
//!
//! Shared library for the WMS scan station containing barcode validation and
//! classification, the scan capture state machine, scan history, and the
//! payload types returned by the warehouse lookup endpoints.
//!
//! It has zero dependencies on OS APIs, UI frameworks, HTTP clients, or async
//! runtimes.
//!
//! # Architecture overview (for beginners)
//!
//! Warehouse staff use handheld barcode scanners that behave like keyboards:
//! the scanner "types" the barcode characters very quickly and then presses
//! Enter.  The scan station listens to those keystrokes, collects them into a
//! buffer, and when Enter arrives decides what the barcode means.
//!
//! - **`domain::barcode`** – Pure rules: is this string a plausible barcode,
//!   and is it a purchase order, an item code, or a supplier barcode?
//!
//! - **`domain::session`** – The capture state machine.  It receives events
//!   (key presses, start/stop requests, timer expiry) and returns a list of
//!   *effects* for the caller to carry out.  The machine itself never touches
//!   the screen, the network, or a timer.
//!
//! - **`domain::history`** – Every successfully validated scan is recorded.
//!
//! - **`domain::lookup`** – The shapes of the JSON payloads the warehouse
//!   backend returns for each kind of barcode.
//!
//! - **`error`** – The scan error taxonomy and the user-facing notifications
//!   each error produces.

pub mod domain;
pub mod error;

// Re-export the most-used types at the crate root so callers can write
// `wms_scan_core::ScanMachine` instead of `wms_scan_core::domain::session::ScanMachine`.
pub use domain::barcode::{classify, validate, BarcodeKind, BarcodeRules};
pub use domain::history::{ScanHistory, ScanHistoryEntry};
pub use domain::lookup::{
    ItemInfo, LookupPayload, PurchaseOrderInfo, PurchaseOrderLine, SupplierInfo,
};
pub use domain::session::{
    KeyClass, KeyPhase, ScanEffect, ScanEvent, ScanMachine, ScanState, ScannerSettings,
};
pub use error::{Notification, ScanError, Severity};
