//! Infrastructure layer for the scan station.
//!
//! Contains the OS- and network-facing adapters: console key input, the HTTP
//! lookup client, TOML config and history files, terminal output with the
//! in-memory form, and the event loop that ties them to the controller.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `wms_scan_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod http;
pub mod key_input;
pub mod runner;
pub mod storage;
pub mod terminal;
