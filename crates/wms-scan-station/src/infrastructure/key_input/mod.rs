//! Key input infrastructure for the scan station.
//!
//! A keyboard-wedge scanner "types" a barcode: one key-down/key-up pair per
//! character followed by `Enter`.  An [`InputSource`] delivers those key
//! events, plus operator commands, to the station's event loop over a Tokio
//! channel.
//!
//! # Implementations
//!
//! - [`stdin::StdinInputSource`] – reads lines from standard input.  Each plain
//!   line becomes a scanner burst; lines starting with `:` are commands.
//! - [`mock::MockInputSource`] – lets tests inject synthetic input.

use std::time::Instant;

use tokio::sync::mpsc::UnboundedReceiver;
use wms_scan_core::{KeyPhase, ScanEvent};

pub mod mock;
pub mod stdin;

/// One key press or release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    /// DOM-style key name: `"A"`, `"7"`, `"Enter"`, `"Escape"`, `"Shift"`.
    pub key: String,
    pub phase: KeyPhase,
    /// When the key event was observed.
    pub at: Instant,
}

impl KeyInput {
    pub fn down(key: impl Into<String>, at: Instant) -> Self {
        Self {
            key: key.into(),
            phase: KeyPhase::Down,
            at,
        }
    }

    pub fn up(key: impl Into<String>, at: Instant) -> Self {
        Self {
            key: key.into(),
            phase: KeyPhase::Up,
            at,
        }
    }

    /// Converts into the state machine's event type.
    pub fn into_event(self) -> ScanEvent {
        ScanEvent::Key {
            key: self.key,
            phase: self.phase,
            at: self.at,
        }
    }
}

/// Operator commands typed at the station console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationCommand {
    /// `:scan [field]` – begin a scan, optionally routed into `field`.
    Start { target: Option<String> },
    /// `:stop` – abandon the active scan.
    Stop,
    /// `:process` – process the buffer now, as the dialog's button does.
    Process,
    /// `:manual CODE` – process a hand-typed code.
    Manual(String),
    /// `:history` – print the scan history.
    History,
    /// `:export` – write the scan history to a JSON file.
    Export,
    /// `:clear` – forget the scan history.
    ClearHistory,
    /// `:quit` – leave the station.
    Quit,
    /// Anything else starting with `:`.
    Unknown(String),
}

/// Everything an [`InputSource`] can deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationInput {
    Key(KeyInput),
    Command(StationCommand),
}

/// Error type for input source operations.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("input source is already running")]
    AlreadyStarted,
    #[error("input source unavailable: {0}")]
    Unavailable(String),
}

/// Trait abstracting station input production.
///
/// Production reads standard input; tests use [`mock::MockInputSource`].
pub trait InputSource: Send + Sync {
    /// Starts the source and returns a receiver for its input.
    fn start(&self) -> Result<UnboundedReceiver<StationInput>, InputError>;
    /// Stops the source.  The receiver sees the channel close.
    fn stop(&self);
    /// Keeps the most recent key from reaching anything else listening.
    fn suppress_current_event(&self);
}
