//! The station's event loop.
//!
//! [`StationRunner`] multiplexes three sources onto the single
//! [`ScanController`]:
//!
//! 1. operator input from an [`InputSource`] (key events and `:` commands),
//! 2. scan-timer expiries posted by the controller itself,
//! 3. a short poll tick so a cleared `running` flag is noticed promptly.
//!
//! Everything runs on one task, so the controller never needs a lock.
//!
//! # Auto-arming
//!
//! A browser page starts a scan when the operator clicks "Scan".  A console
//! station has no button, so the first printable key-down that arrives while
//! idle starts a session (routed to the default target, if any) before the
//! key itself is fed to the machine.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use wms_scan_core::{KeyClass, KeyPhase, Notification, ScanEvent, Severity};

use crate::application::ports::Notifier;
use crate::application::scan_controller::ScanController;
use crate::infrastructure::key_input::{
    InputError, InputSource, KeyInput, StationCommand, StationInput,
};
use crate::infrastructure::storage::history_export::export_history;
use crate::infrastructure::terminal::TerminalUi;

/// How often the loop re-checks the `running` flag when nothing else happens.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// What a finished run left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of validated scans in the history at shutdown.
    pub scans: usize,
    /// File written by the on-exit history export, if any.
    pub exported: Option<PathBuf>,
}

/// Owns the controller and drives it from station input.
pub struct StationRunner {
    controller: ScanController,
    timeouts: UnboundedReceiver<ScanEvent>,
    source: Arc<dyn InputSource>,
    ui: Arc<TerminalUi>,
    default_target: Option<String>,
    history_dir: PathBuf,
}

impl StationRunner {
    pub fn new(
        controller: ScanController,
        timeouts: UnboundedReceiver<ScanEvent>,
        source: Arc<dyn InputSource>,
        ui: Arc<TerminalUi>,
        default_target: Option<String>,
        history_dir: PathBuf,
    ) -> Self {
        Self {
            controller,
            timeouts,
            source,
            ui,
            default_target,
            history_dir,
        }
    }

    /// Starts the input source and runs until `running` is cleared, the
    /// operator quits, or input ends.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] if the input source cannot be started.
    pub async fn run(self, running: Arc<AtomicBool>) -> Result<RunSummary, InputError> {
        let input = self.source.start()?;
        Ok(self.run_with(input, running).await)
    }

    /// Runs the loop over an already-started input channel.
    pub async fn run_with(
        mut self,
        mut input: UnboundedReceiver<StationInput>,
        running: Arc<AtomicBool>,
    ) -> RunSummary {
        info!("scan station ready");

        while running.load(Ordering::SeqCst) {
            tokio::select! {
                Some(event) = self.timeouts.recv() => {
                    self.controller.handle(event).await;
                }
                next = input.recv() => match next {
                    Some(StationInput::Key(key)) => self.on_key(key).await,
                    Some(StationInput::Command(command)) => {
                        if !self.on_command(command).await {
                            break;
                        }
                    }
                    None => {
                        info!("station input closed");
                        break;
                    }
                },
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }

        self.shutdown().await
    }

    async fn on_key(&mut self, key: KeyInput) {
        if !self.controller.is_scanning()
            && key.phase == KeyPhase::Down
            && matches!(KeyClass::from_key(&key.key), KeyClass::Char(_))
        {
            debug!("key burst while idle, starting scan");
            self.controller.start(self.default_target.clone()).await;
        }

        let handled = self.controller.handle(key.into_event()).await;
        if handled.suppress_default {
            self.source.suppress_current_event();
        }
    }

    /// Applies one operator command.  Returns `false` when the loop should end.
    async fn on_command(&mut self, command: StationCommand) -> bool {
        debug!(?command, "station command");
        match command {
            StationCommand::Start { target } => {
                let target = target.or_else(|| self.default_target.clone());
                self.controller.start(target).await;
            }
            StationCommand::Stop => {
                self.controller.stop().await;
            }
            StationCommand::Process => {
                self.controller.handle(ScanEvent::ProcessRequested).await;
            }
            StationCommand::Manual(code) => {
                self.controller.handle(ScanEvent::Manual(code)).await;
            }
            StationCommand::History => self.ui.print_history(self.controller.history()),
            StationCommand::Export => {
                self.export();
            }
            StationCommand::ClearHistory => {
                self.controller.clear_history();
                self.ui.notify(Notification::info("Scan history cleared"));
            }
            StationCommand::Quit => return false,
            StationCommand::Unknown(text) => {
                self.ui.notify(Notification::new(
                    Severity::Warning,
                    format!("Unknown command: :{text}"),
                ));
            }
        }
        true
    }

    fn export(&self) -> Option<PathBuf> {
        match export_history(self.controller.history(), &self.history_dir) {
            Ok(path) => {
                self.ui.notify(Notification::success(format!(
                    "Scan history exported to {}",
                    path.display()
                )));
                Some(path)
            }
            Err(e) => {
                warn!("history export failed: {e}");
                self.ui.notify(Notification::new(
                    Severity::Error,
                    "Failed to export scan history",
                ));
                None
            }
        }
    }

    async fn shutdown(mut self) -> RunSummary {
        self.source.stop();
        self.controller.stop().await;

        let scans = self.controller.history().len();
        let exported = if scans > 0 { self.export() } else { None };
        info!(scans, "scan station stopped");
        RunSummary { scans, exported }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch::{Dispatcher, LookupClient, LookupError, LookupReply};
    use crate::application::form_submit::{FormSubmitter, SubmitClient, SubmitError};
    use crate::application::ports::{FormFields, PanelRenderer, ScanIndicator};
    use crate::infrastructure::key_input::mock::MockInputSource;
    use crate::infrastructure::terminal::form::InMemoryForm;
    use crate::infrastructure::terminal::SharedBuffer;
    use async_trait::async_trait;
    use serde_json::Value;
    use uuid::Uuid;
    use wms_scan_core::{BarcodeKind, ScannerSettings};

    struct AlwaysRejects;

    #[async_trait]
    impl LookupClient for AlwaysRejects {
        async fn lookup(&self, _: BarcodeKind, _: &str) -> Result<LookupReply, LookupError> {
            Ok(LookupReply::Rejected("not found".to_string()))
        }
    }

    #[async_trait]
    impl SubmitClient for AlwaysRejects {
        async fn submit(&self, _: &str, _: &Value) -> Result<Value, SubmitError> {
            Err(SubmitError::Transport("not found".to_string()))
        }
    }

    struct Harness {
        runner: StationRunner,
        source: Arc<MockInputSource>,
        output: SharedBuffer,
        dir: PathBuf,
    }

    fn harness() -> Harness {
        let output = SharedBuffer::default();
        let ui = Arc::new(TerminalUi::with_writer(Box::new(output.clone())));
        let forms: Arc<dyn FormFields> = Arc::new(InMemoryForm::default());
        let dispatcher = Dispatcher::new(
            Arc::new(AlwaysRejects),
            Arc::clone(&ui) as Arc<dyn PanelRenderer>,
            Arc::clone(&forms),
            Arc::clone(&ui) as Arc<dyn Notifier>,
        );
        let submitter = FormSubmitter::new(
            Arc::new(AlwaysRejects),
            Arc::clone(&forms),
            Arc::clone(&ui) as Arc<dyn Notifier>,
        );
        let (controller, timeouts) = ScanController::new(
            ScannerSettings::default(),
            dispatcher,
            submitter,
            forms,
            Arc::clone(&ui) as Arc<dyn Notifier>,
            Arc::clone(&ui) as Arc<dyn ScanIndicator>,
        );
        let source = Arc::new(MockInputSource::new());
        let dir = std::env::temp_dir().join(format!("wms_scan_runner_{}", Uuid::new_v4()));
        let runner = StationRunner::new(
            controller,
            timeouts,
            Arc::clone(&source) as Arc<dyn InputSource>,
            ui,
            None,
            dir.clone(),
        );
        Harness {
            runner,
            source,
            output,
            dir,
        }
    }

    #[tokio::test]
    async fn test_key_burst_auto_arms_and_quit_exports_history() {
        // Arrange
        let h = harness();
        let input = h.source.start().unwrap();
        h.source.inject_scan("PO-12345");
        h.source.inject_command(StationCommand::Quit);

        // Act
        let summary = h
            .runner
            .run_with(input, Arc::new(AtomicBool::new(true)))
            .await;

        // Assert
        assert_eq!(summary.scans, 1);
        let exported = summary.exported.expect("history should be exported on exit");
        assert!(exported.starts_with(&h.dir));
        assert_eq!(h.source.suppress_count(), 1, "Enter must be suppressed");
        let out = h.output.contents();
        assert!(out.contains("Scanning barcode..."));
        assert!(out.contains("[error] not found"));
        std::fs::remove_dir_all(&h.dir).ok();
    }

    #[tokio::test]
    async fn test_empty_history_is_not_exported() {
        let h = harness();
        let input = h.source.start().unwrap();
        h.source.inject_command(StationCommand::Unknown("bogus".to_string()));
        h.source.inject_command(StationCommand::Quit);

        let summary = h
            .runner
            .run_with(input, Arc::new(AtomicBool::new(true)))
            .await;

        assert_eq!(summary, RunSummary::default());
        assert!(h.output.contents().contains("[warning] Unknown command: :bogus"));
        assert!(!h.dir.exists());
    }

    #[tokio::test]
    async fn test_clear_history_command_forgets_scans() {
        let h = harness();
        let input = h.source.start().unwrap();
        h.source.inject_command(StationCommand::Manual("XYZ999".to_string()));
        h.source.inject_command(StationCommand::ClearHistory);
        h.source.inject_command(StationCommand::Quit);

        let summary = h
            .runner
            .run_with(input, Arc::new(AtomicBool::new(true)))
            .await;

        assert_eq!(summary.scans, 0);
        let out = h.output.contents();
        assert!(out.contains("[warning] Barcode type not recognized"));
        assert!(out.contains("[info] Scan history cleared"));
    }

    #[tokio::test]
    async fn test_closed_input_ends_run() {
        let h = harness();
        let input = h.source.start().unwrap();
        h.source.stop();

        let summary = h
            .runner
            .run_with(input, Arc::new(AtomicBool::new(true)))
            .await;

        assert_eq!(summary.scans, 0);
    }

    #[tokio::test]
    async fn test_cleared_running_flag_ends_run() {
        let h = harness();
        let input = h.source.start().unwrap();

        let summary = h
            .runner
            .run_with(input, Arc::new(AtomicBool::new(false)))
            .await;

        assert_eq!(summary.scans, 0);
    }
}
