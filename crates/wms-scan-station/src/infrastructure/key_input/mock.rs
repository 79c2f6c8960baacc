//! Mock input source for tests.
//!
//! Lets tests inject key events and commands without a terminal.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::stdin::parse_console_line;
use super::{InputError, InputSource, KeyInput, StationCommand, StationInput};

/// An [`InputSource`] driven by the test.
pub struct MockInputSource {
    sender: Arc<Mutex<Option<UnboundedSender<StationInput>>>>,
    suppress_count: Arc<Mutex<u32>>,
}

impl MockInputSource {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(Mutex::new(None)),
            suppress_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Injects one input, as if typed at the console.
    ///
    /// Panics if `start()` has not been called or if `stop()` has been called.
    pub fn inject(&self, input: StationInput) {
        let guard = self.sender.lock().expect("lock poisoned");
        match guard.as_ref() {
            Some(sender) => sender
                .send(input)
                .expect("receiver has been dropped; call start() first"),
            None => panic!("MockInputSource::inject called before start()"),
        }
    }

    pub fn inject_key(&self, key: KeyInput) {
        self.inject(StationInput::Key(key));
    }

    pub fn inject_command(&self, command: StationCommand) {
        self.inject(StationInput::Command(command));
    }

    /// Injects a whole scanner burst: every character down/up, then `Enter`.
    pub fn inject_scan(&self, barcode: &str) {
        for input in parse_console_line(barcode, Instant::now()) {
            self.inject(input);
        }
    }

    /// Number of times [`InputSource::suppress_current_event`] was called.
    pub fn suppress_count(&self) -> u32 {
        *self.suppress_count.lock().expect("lock poisoned")
    }
}

impl Default for MockInputSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for MockInputSource {
    fn start(&self) -> Result<UnboundedReceiver<StationInput>, InputError> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().expect("lock poisoned") = Some(tx);
        Ok(rx)
    }

    fn stop(&self) {
        // Dropping the sender closes the channel.
        *self.sender.lock().expect("lock poisoned") = None;
    }

    fn suppress_current_event(&self) {
        *self.suppress_count.lock().expect("lock poisoned") += 1;
    }
}
