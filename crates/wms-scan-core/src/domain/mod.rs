//! Domain entities for the WMS scan station.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of a Clean Architecture codebase is the **domain**.
//! Domain code holds the core rules of the application, imports nothing from
//! OS APIs, HTTP clients, or UI frameworks, and can be tested on any machine
//! without setup.  Here that means: what a valid barcode looks like, how a
//! barcode is classified, and how a scan session moves between states.

/// Barcode validation and prefix classification.
pub mod barcode;

/// Record of successfully validated scans.
pub mod history;

/// Payload types returned by the lookup endpoints.
pub mod lookup;

/// The scan capture state machine.
///
/// See [`session::ScanMachine`] for the main type.
pub mod session;
