//! Storage infrastructure: configuration and scan history files.
//!
//! - `config` reads the station's TOML configuration from the
//!   platform-appropriate directory (or a path given on the command line) and
//!   falls back to defaults on first run.
//! - `history_export` writes the session's scan history as a dated JSON file.

pub mod config;
pub mod history_export;
