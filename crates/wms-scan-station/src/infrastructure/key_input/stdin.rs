//! Standard-input key source.
//!
//! Most keyboard-wedge scanners can be configured to emit a line per barcode,
//! so a terminal on the station is a good stand-in for a focused browser
//! page.  Each line read from stdin is turned back into the key events the
//! scanner would have produced.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, trace};

use super::{InputError, InputSource, KeyInput, StationCommand, StationInput};

/// Reads operator input from stdin on a dedicated OS thread.
///
/// A blocking read cannot be cancelled, so the reader thread is detached and
/// checks `running` between lines.  The thread ends on EOF, on a read error,
/// or on the first line after [`InputSource::stop`].
#[derive(Default)]
pub struct StdinInputSource {
    started: AtomicBool,
    running: Arc<AtomicBool>,
}

impl StdinInputSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputSource for StdinInputSource {
    fn start(&self) -> Result<UnboundedReceiver<StationInput>, InputError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(InputError::AlreadyStarted);
        }
        self.running.store(true, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded_channel();
        let running = Arc::clone(&self.running);
        std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            debug!("stdin read failed: {e}");
                            break;
                        }
                    };
                    for input in parse_console_line(&line, Instant::now()) {
                        if tx.send(input).is_err() {
                            return;
                        }
                    }
                }
                debug!("stdin reader finished");
            })
            .map_err(|e| InputError::Unavailable(e.to_string()))?;
        Ok(rx)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn suppress_current_event(&self) {
        // A line has already been consumed by the time it is read; there is
        // nothing left to hold back.
        trace!("suppress requested for console input");
    }
}

/// Turns one console line into station input.
///
/// - Blank lines produce nothing.
/// - Lines starting with `:` are commands.
/// - Anything else is a scanner burst: a down/up pair per character, all
///   stamped `at`, then `Enter` down/up.
pub fn parse_console_line(line: &str, at: Instant) -> Vec<StationInput> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Vec::new();
    }

    if let Some(command) = line.trim_start().strip_prefix(':') {
        return vec![StationInput::Command(parse_command(command))];
    }

    let mut inputs = Vec::with_capacity(line.chars().count() * 2 + 2);
    for ch in line.chars() {
        let key = ch.to_string();
        inputs.push(StationInput::Key(KeyInput::down(key.clone(), at)));
        inputs.push(StationInput::Key(KeyInput::up(key, at)));
    }
    inputs.push(StationInput::Key(KeyInput::down("Enter", at)));
    inputs.push(StationInput::Key(KeyInput::up("Enter", at)));
    inputs
}

fn parse_command(text: &str) -> StationCommand {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts
        .next()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    match name {
        "scan" | "s" => StationCommand::Start { target: arg },
        "stop" => StationCommand::Stop,
        "process" | "p" => StationCommand::Process,
        "manual" | "m" => match arg {
            Some(code) => StationCommand::Manual(code),
            None => StationCommand::Unknown(text.trim().to_string()),
        },
        "history" | "h" => StationCommand::History,
        "export" => StationCommand::Export,
        "clear" => StationCommand::ClearHistory,
        "quit" | "q" | "exit" => StationCommand::Quit,
        _ => StationCommand::Unknown(text.trim().to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wms_scan_core::KeyPhase;

    fn command(line: &str) -> StationCommand {
        match parse_console_line(line, Instant::now()).as_slice() {
            [StationInput::Command(c)] => c.clone(),
            other => panic!("expected one command, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_line_produces_nothing() {
        assert!(parse_console_line("", Instant::now()).is_empty());
        assert!(parse_console_line("   \r", Instant::now()).is_empty());
    }

    #[test]
    fn test_plain_line_becomes_key_burst_with_enter() {
        // Arrange
        let at = Instant::now();

        // Act
        let inputs = parse_console_line("AB\r", at);

        // Assert
        let expected = vec![
            StationInput::Key(KeyInput::down("A", at)),
            StationInput::Key(KeyInput::up("A", at)),
            StationInput::Key(KeyInput::down("B", at)),
            StationInput::Key(KeyInput::up("B", at)),
            StationInput::Key(KeyInput::down("Enter", at)),
            StationInput::Key(KeyInput::up("Enter", at)),
        ];
        assert_eq!(inputs, expected);
    }

    #[test]
    fn test_scan_command_with_and_without_target() {
        assert_eq!(command(":scan"), StationCommand::Start { target: None });
        assert_eq!(
            command(":scan  receipt_item "),
            StationCommand::Start {
                target: Some("receipt_item".to_string())
            }
        );
    }

    #[test]
    fn test_manual_command_requires_code() {
        assert_eq!(
            command(":manual PO-12345"),
            StationCommand::Manual("PO-12345".to_string())
        );
        assert_eq!(command(":manual"), StationCommand::Unknown("manual".to_string()));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(command(":stop"), StationCommand::Stop);
        assert_eq!(command(":process"), StationCommand::Process);
        assert_eq!(command(":history"), StationCommand::History);
        assert_eq!(command(":export"), StationCommand::Export);
        assert_eq!(command(":clear"), StationCommand::ClearHistory);
        assert_eq!(command(":q"), StationCommand::Quit);
        assert_eq!(command(":bogus"), StationCommand::Unknown("bogus".to_string()));
    }

    #[test]
    fn test_key_input_converts_to_scan_event() {
        let at = Instant::now();
        let event = KeyInput::up("7", at).into_event();
        assert_eq!(
            event,
            wms_scan_core::ScanEvent::Key {
                key: "7".to_string(),
                phase: KeyPhase::Up,
                at
            }
        );
    }
}
