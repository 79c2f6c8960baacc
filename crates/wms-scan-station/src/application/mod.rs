//! Application layer use cases for the scan station.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure business rules in `wms-scan-core`) and the infrastructure (terminal,
//! HTTP, file system).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "turn a burst
//!   of keystrokes into a purchase-order lookup").
//! - **Depend on abstractions** (the traits in [`ports`] and
//!   [`dispatch::LookupClient`]) rather than concrete implementations.
//! - **Contain no direct OS calls, network I/O, or file system access**.
//!
//! # Sub-modules
//!
//! - **`ports`** – Traits for notifications, the capture indicator, panel
//!   rendering, and form fields.
//!
//! - **`dispatch`** – Looks a classified barcode up, renders the result, and
//!   auto-fills supplier data into the form.
//!
//! - **`form_submit`** – Checks required fields and posts the form a scan was
//!   routed into when that field is marked auto-submit.
//!
//! - **`scan_controller`** – Owns the [`wms_scan_core::ScanMachine`], feeds it
//!   events, and carries out the effects it returns, including the scan timer.

pub mod dispatch;
pub mod form_submit;
pub mod ports;
pub mod scan_controller;
