//! The scan capture state machine.
//!
//! [`ScanMachine`] owns the only piece of mutable scan state in the station:
//! whether a scan session is active, the characters collected so far, and the
//! history of validated scans.  It is driven entirely by [`ScanEvent`]s and
//! answers each event with a list of [`ScanEffect`]s.  Showing the capture
//! indicator, arming a timer, writing a form field, or calling a lookup
//! endpoint are all the caller's job.
//!
//! # States
//!
//! ```text
//!            Start                      Enter / Escape / Timeout / Stop
//!   Idle ───────────────► Scanning ─────────────────────────────────────► Idle
//!                          │    ▲
//!                          └────┘  character keys, key-up gap check,
//!                                  Start (restarts with a fresh buffer)
//! ```
//!
//! # Timeouts and generations
//!
//! Every `Start` bumps a generation counter and asks the caller to arm a timer
//! stamped with that generation.  When the timer fires the caller delivers
//! [`ScanEvent::TimeoutElapsed`] with the same stamp.  The machine acts on it
//! only if a session is still active *and* the stamp matches the current
//! generation, so a timer that lost the race against Enter, Escape, Stop, or a
//! newer Start is silently ignored even if the caller failed to cancel it.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::barcode::{classify, BarcodeKind, BarcodeRules};
use super::history::ScanHistory;
use crate::error::ScanError;

/// Default time allowed between `Start` and the terminator.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default maximum gap between key-ups of one scanner burst.
pub const DEFAULT_BURST_GAP: Duration = Duration::from_millis(100);

/// Tunables for the capture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerSettings {
    /// How long a session may stay open without a terminator.
    pub scan_timeout: Duration,
    /// Key-ups further apart than this discard the buffer.  Scanners type a
    /// whole barcode within a few milliseconds per key; people do not.
    pub burst_gap: Duration,
    /// Validation bounds applied on completion.
    pub rules: BarcodeRules,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            burst_gap: DEFAULT_BURST_GAP,
            rules: BarcodeRules::default(),
        }
    }
}

/// Whether a key event is a press or a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Down,
    Up,
}

/// The meaning of a key name for scanning purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// `Enter`: end of barcode.
    Terminator,
    /// `Escape`: abandon the scan.
    Cancel,
    /// A single printable character.
    Char(char),
    /// Modifiers, navigation keys, and anything else with a multi-character name.
    Other,
}

impl KeyClass {
    /// Classifies a DOM-style key name (`"a"`, `"Enter"`, `"Shift"`, ...).
    pub fn from_key(key: &str) -> Self {
        match key {
            "Enter" => KeyClass::Terminator,
            "Escape" => KeyClass::Cancel,
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyClass::Char(c),
                    _ => KeyClass::Other,
                }
            }
        }
    }
}

/// Inputs to [`ScanMachine::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Begin a scan.  `target` selects target-routed mode.
    Start { target: Option<String>, at: Instant },
    /// Abandon any active scan.  Safe in every state.
    Stop,
    /// A key was pressed or released.
    Key {
        key: String,
        phase: KeyPhase,
        at: Instant,
    },
    /// Process the current buffer as if the terminator had been pressed.
    ProcessRequested,
    /// Process a code typed into a manual-entry prompt.
    Manual(String),
    /// A timer armed by [`ScanEffect::ArmTimeout`] elapsed.
    TimeoutElapsed { generation: u64 },
}

/// Side effects requested by the machine, in the order they must be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEffect {
    /// Show the "scanning" indicator.
    ShowIndicator,
    /// Hide the "scanning" indicator.
    HideIndicator,
    /// Refresh the live display with the current buffer.
    UpdateDisplay(String),
    /// Arm the single scan timer.  Any previously armed timer is obsolete.
    ArmTimeout { generation: u64, after: Duration },
    /// Cancel the scan timer.
    DisarmTimeout,
    /// Prevent the key from reaching whatever else is listening.
    SuppressDefault,
    /// The scan ended without a usable result.
    Failed(ScanError),
    /// Target-routed completion: write `barcode` into `field_id`.
    WriteTarget { field_id: String, barcode: String },
    /// Classifier completion: look the barcode up.
    Dispatch { kind: BarcodeKind, barcode: String },
}

/// Observable machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// One scan attempt.  Exists only while scanning.
#[derive(Debug, Clone)]
struct ScanSession {
    target: Option<String>,
    buffer: String,
    started_at: Instant,
    last_key_at: Option<Instant>,
    generation: u64,
}

/// The scan capture state machine.
#[derive(Debug)]
pub struct ScanMachine {
    settings: ScannerSettings,
    session: Option<ScanSession>,
    generation: u64,
    history: ScanHistory,
}

impl ScanMachine {
    pub fn new(settings: ScannerSettings) -> Self {
        Self {
            settings,
            session: None,
            generation: 0,
            history: ScanHistory::new(),
        }
    }

    pub fn state(&self) -> ScanState {
        if self.session.is_some() {
            ScanState::Scanning
        } else {
            ScanState::Idle
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.session.is_some()
    }

    /// The characters collected by the active session, if any.
    pub fn buffer(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.buffer.as_str())
    }

    /// The target field of the active session, if any.
    pub fn target(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.target.as_deref())
    }

    /// When the active session started.
    pub fn started_at(&self) -> Option<Instant> {
        self.session.as_ref().map(|s| s.started_at)
    }

    /// Generation of the most recent `Start`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn history(&self) -> &ScanHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Applies one event and returns the effects the caller must carry out.
    pub fn handle(&mut self, event: ScanEvent) -> Vec<ScanEffect> {
        match event {
            ScanEvent::Start { target, at } => self.start(target, at),
            ScanEvent::Stop => self.end_session(),
            ScanEvent::Key {
                key,
                phase: KeyPhase::Down,
                ..
            } => self.key_down(&key),
            ScanEvent::Key {
                phase: KeyPhase::Up,
                at,
                ..
            } => self.key_up(at),
            ScanEvent::ProcessRequested => match self.session.as_ref() {
                Some(_) => self.complete(None),
                None => Vec::new(),
            },
            ScanEvent::Manual(code) => self.complete(Some(code)),
            ScanEvent::TimeoutElapsed { generation } => self.timeout(generation),
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    fn start(&mut self, target: Option<String>, at: Instant) -> Vec<ScanEffect> {
        let mut effects = self.end_session();

        self.generation = self.generation.wrapping_add(1);
        info!(generation = self.generation, target = ?target, "scan started");
        self.session = Some(ScanSession {
            target,
            buffer: String::new(),
            started_at: at,
            last_key_at: None,
            generation: self.generation,
        });

        effects.push(ScanEffect::ShowIndicator);
        effects.push(ScanEffect::ArmTimeout {
            generation: self.generation,
            after: self.settings.scan_timeout,
        });
        effects
    }

    /// Drops the active session.  Returns no effects when already idle.
    fn end_session(&mut self) -> Vec<ScanEffect> {
        match self.session.take() {
            Some(session) => {
                debug!(generation = session.generation, "scan session ended");
                vec![ScanEffect::DisarmTimeout, ScanEffect::HideIndicator]
            }
            None => Vec::new(),
        }
    }

    fn key_down(&mut self, key: &str) -> Vec<ScanEffect> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        match KeyClass::from_key(key) {
            KeyClass::Terminator => {
                let mut effects = vec![ScanEffect::SuppressDefault];
                effects.extend(self.complete(None));
                effects
            }
            KeyClass::Cancel => {
                debug!("scan cancelled");
                let mut effects = vec![ScanEffect::SuppressDefault];
                effects.extend(self.end_session());
                effects
            }
            KeyClass::Char(c) => {
                session.buffer.push(c);
                vec![ScanEffect::UpdateDisplay(session.buffer.clone())]
            }
            KeyClass::Other => Vec::new(),
        }
    }

    fn key_up(&mut self, at: Instant) -> Vec<ScanEffect> {
        let burst_gap = self.settings.burst_gap;
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        let gap_exceeded = session
            .last_key_at
            .map(|prev| at.saturating_duration_since(prev) > burst_gap)
            .unwrap_or(false);
        session.last_key_at = Some(at);

        if gap_exceeded && !session.buffer.is_empty() {
            debug!(
                discarded = session.buffer.len(),
                "key gap exceeded burst window, buffer discarded"
            );
            session.buffer.clear();
            return vec![ScanEffect::UpdateDisplay(String::new())];
        }
        Vec::new()
    }

    fn timeout(&mut self, generation: u64) -> Vec<ScanEffect> {
        match self.session.as_ref() {
            Some(session) if session.generation == generation => {
                warn!(generation, "scan timed out");
                let mut effects = self.end_session();
                effects.push(ScanEffect::Failed(ScanError::Timeout));
                effects
            }
            _ => {
                debug!(generation, current = self.generation, "stale scan timeout ignored");
                Vec::new()
            }
        }
    }

    /// Ends the active session (if any) and processes either `manual` or the
    /// session buffer.
    fn complete(&mut self, manual: Option<String>) -> Vec<ScanEffect> {
        let (target, buffered) = match self.session.as_ref() {
            Some(s) => (s.target.clone(), s.buffer.clone()),
            None => (None, String::new()),
        };
        let raw = manual.unwrap_or(buffered);

        let mut effects = self.end_session();
        effects.extend(self.process(raw.trim(), target));
        effects
    }

    fn process(&mut self, barcode: &str, target: Option<String>) -> Vec<ScanEffect> {
        if !self.settings.rules.validate(barcode) {
            warn!(len = barcode.len(), "invalid barcode format");
            return vec![ScanEffect::Failed(ScanError::InvalidFormat)];
        }

        self.history.record(barcode, target.clone());

        if let Some(field_id) = target {
            info!(%barcode, %field_id, "target-routed scan");
            return vec![ScanEffect::WriteTarget {
                field_id,
                barcode: barcode.to_string(),
            }];
        }

        match classify(barcode) {
            BarcodeKind::Unrecognized => {
                warn!(%barcode, "barcode type not recognized");
                vec![ScanEffect::Failed(ScanError::Unrecognized)]
            }
            kind => {
                info!(%barcode, %kind, "barcode classified");
                vec![ScanEffect::Dispatch {
                    kind,
                    barcode: barcode.to_string(),
                }]
            }
        }
    }
}

impl Default for ScanMachine {
    fn default() -> Self {
        Self::new(ScannerSettings::default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
