//! Scan controller: drives the [`ScanMachine`] and carries out its effects.
//!
//! The machine itself is pure; it never touches a timer, a form, or the
//! network.  This controller is the single owner of the machine and the only
//! place where its [`ScanEffect`]s turn into real work:
//!
//! ```text
//!  ScanEvent ──► ScanMachine::handle ──► Vec<ScanEffect> ──► ScanController
//!                                                              │
//!      ┌───────────────┬──────────────┬──────────────┬─────────┴────────┐
//!      ▼               ▼              ▼              ▼                  ▼
//!  ScanIndicator    scan timer     Notifier      FormFields         Dispatcher
//!                                                      │
//!                                                      ▼
//!                                                FormSubmitter
//! ```
//!
//! A target-routed scan that lands in an auto-submit field hands the
//! enclosing form to the [`FormSubmitter`] before the event finishes.
//!
//! # Scan timer
//!
//! `ArmTimeout` spawns a task that sleeps for the timeout and then posts
//! [`ScanEvent::TimeoutElapsed`] into the channel returned by
//! [`ScanController::new`].  The event loop feeds that event back through
//! [`ScanController::handle`].  `DisarmTimeout` aborts the task.  If an abort
//! loses the race, the generation stamp makes the late event a no-op.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use wms_scan_core::{
    KeyPhase, LookupPayload, Notification, ScanEffect, ScanError, ScanEvent, ScanHistory,
    ScanMachine, ScannerSettings,
};

use super::dispatch::Dispatcher;
use super::form_submit::FormSubmitter;
use super::ports::{FormFields, Notifier, ScanIndicator};

const TARGET_SUCCESS_MESSAGE: &str = "Barcode scanned successfully";

/// How a completed scan ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Target-routed mode wrote the barcode into `field_id`.
    Routed { field_id: String, submitted: bool },
    /// Classifier mode looked the barcode up successfully.
    Found(LookupPayload),
    /// The scan ended without a usable result.
    Failed(ScanError),
}

/// What [`ScanController::handle`] did with one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Handled {
    /// The key must not reach anything else listening for input.
    pub suppress_default: bool,
    /// Set when this event finished a scan.
    pub outcome: Option<ScanOutcome>,
}

/// Owns the scan state machine and applies its effects.
pub struct ScanController {
    machine: ScanMachine,
    dispatcher: Dispatcher,
    submitter: FormSubmitter,
    forms: Arc<dyn FormFields>,
    notifier: Arc<dyn Notifier>,
    indicator: Arc<dyn ScanIndicator>,
    timer: Option<JoinHandle<()>>,
    timeout_tx: UnboundedSender<ScanEvent>,
}

impl ScanController {
    /// Creates a controller and the receiver on which its scan timer posts
    /// [`ScanEvent::TimeoutElapsed`].
    pub fn new(
        settings: ScannerSettings,
        dispatcher: Dispatcher,
        submitter: FormSubmitter,
        forms: Arc<dyn FormFields>,
        notifier: Arc<dyn Notifier>,
        indicator: Arc<dyn ScanIndicator>,
    ) -> (Self, UnboundedReceiver<ScanEvent>) {
        let (timeout_tx, timeout_rx) = mpsc::unbounded_channel();
        let controller = Self {
            machine: ScanMachine::new(settings),
            dispatcher,
            submitter,
            forms,
            notifier,
            indicator,
            timer: None,
            timeout_tx,
        };
        (controller, timeout_rx)
    }

    // ── Convenience entry points ──────────────────────────────────────────────

    /// Begins a scan.  `target` selects target-routed mode.
    pub async fn start(&mut self, target: Option<String>) -> Handled {
        self.handle(ScanEvent::Start {
            target,
            at: Instant::now(),
        })
        .await
    }

    /// Abandons any active scan.
    pub async fn stop(&mut self) -> Handled {
        self.handle(ScanEvent::Stop).await
    }

    /// Feeds one key event stamped with the current time.
    pub async fn key(&mut self, key: &str, phase: KeyPhase) -> Handled {
        self.handle(ScanEvent::Key {
            key: key.to_string(),
            phase,
            at: Instant::now(),
        })
        .await
    }

    pub fn is_scanning(&self) -> bool {
        self.machine.is_scanning()
    }

    pub fn history(&self) -> &ScanHistory {
        self.machine.history()
    }

    pub fn clear_history(&mut self) {
        self.machine.clear_history();
    }

    // ── Event handling ────────────────────────────────────────────────────────

    /// Feeds `event` to the machine and applies every resulting effect in
    /// order.  A dispatch effect is awaited before this returns.
    pub async fn handle(&mut self, event: ScanEvent) -> Handled {
        let started_at = self.machine.started_at();
        let effects = self.machine.handle(event);
        let mut handled = Handled::default();

        for effect in effects {
            debug!(?effect, "applying scan effect");
            match effect {
                ScanEffect::ShowIndicator => self.indicator.show(),
                ScanEffect::HideIndicator => self.indicator.hide(),
                ScanEffect::UpdateDisplay(buffer) => self.indicator.update_display(&buffer),
                ScanEffect::ArmTimeout { generation, after } => self.arm_timer(generation, after),
                ScanEffect::DisarmTimeout => self.disarm_timer(),
                ScanEffect::SuppressDefault => handled.suppress_default = true,
                ScanEffect::Failed(err) => {
                    self.notifier.notify(Notification::from(&err));
                    handled.outcome = Some(ScanOutcome::Failed(err));
                }
                ScanEffect::WriteTarget { field_id, barcode } => {
                    handled.outcome = Some(self.write_target(field_id, &barcode).await);
                }
                ScanEffect::Dispatch { kind, barcode } => {
                    let outcome = match self.dispatcher.dispatch(kind, &barcode).await {
                        Ok(payload) => ScanOutcome::Found(payload),
                        Err(err) => ScanOutcome::Failed(err),
                    };
                    handled.outcome = Some(outcome);
                }
            }
        }

        if let (Some(outcome), Some(started_at)) = (&handled.outcome, started_at) {
            debug!(
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                ?outcome,
                "scan finished"
            );
        }
        handled
    }

    fn arm_timer(&mut self, generation: u64, after: std::time::Duration) {
        self.disarm_timer();
        let tx = self.timeout_tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // The receiver is gone only when the station is shutting down.
            let _ = tx.send(ScanEvent::TimeoutElapsed { generation });
        }));
    }

    fn disarm_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    /// Writes `barcode` into `field_id`, fires change, and submits the
    /// enclosing form once if the field asks for it.
    async fn write_target(&self, field_id: String, barcode: &str) -> ScanOutcome {
        if !self.forms.set_value(&field_id, barcode) {
            warn!(%field_id, %barcode, "scan target field not found");
            return ScanOutcome::Routed {
                field_id,
                submitted: false,
            };
        }
        self.forms.notify_change(&field_id);
        info!(%field_id, %barcode, "barcode written to target field");
        self.notifier.notify(Notification::success(TARGET_SUCCESS_MESSAGE));

        let submitted = if self.forms.is_auto_submit(&field_id) {
            self.submitter.submit(&field_id).await.is_accepted()
        } else {
            false
        };

        ScanOutcome::Routed {
            field_id,
            submitted,
        }
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        self.disarm_timer();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch::{LookupClient, LookupError, LookupReply};
    use crate::application::form_submit::{FormSnapshot, SubmitClient, SubmitError};
    use crate::application::ports::PanelRenderer;
    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;
    use wms_scan_core::{BarcodeKind, Severity, SupplierInfo};

    // ── Test doubles ──────────────────────────────────────────────────────────

    mock! {
        pub Form {}
        impl FormFields for Form {
            fn set_value(&self, field_id: &str, value: &str) -> bool;
            fn notify_change(&self, field_id: &str);
            fn is_auto_submit(&self, field_id: &str) -> bool;
            fn enclosing_form(&self, field_id: &str) -> Option<FormSnapshot>;
            fn mark_invalid(&self, field_ids: &[String]);
            fn mark_submitted(&self, snapshot: &FormSnapshot);
        }
    }

    struct FixedLookup(LookupReply);

    #[async_trait]
    impl LookupClient for FixedLookup {
        async fn lookup(&self, _: BarcodeKind, _: &str) -> Result<LookupReply, LookupError> {
            Ok(self.0.clone())
        }
    }

    struct NoRender;

    impl PanelRenderer for NoRender {
        fn render(&self, _: &LookupPayload) {}
    }

    #[derive(Default)]
    struct Recorder {
        notes: Mutex<Vec<Notification>>,
        indicator: Mutex<Vec<String>>,
        submissions: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl SubmitClient for Recorder {
        async fn submit(&self, action: &str, body: &Value) -> Result<Value, SubmitError> {
            self.submissions
                .lock()
                .unwrap()
                .push((action.to_string(), body.clone()));
            Ok(json!({"success": true}))
        }
    }

    impl Notifier for Recorder {
        fn notify(&self, notification: Notification) {
            self.notes.lock().unwrap().push(notification);
        }
    }

    impl ScanIndicator for Recorder {
        fn show(&self) {
            self.indicator.lock().unwrap().push("show".to_string());
        }
        fn hide(&self) {
            self.indicator.lock().unwrap().push("hide".to_string());
        }
        fn update_display(&self, buffer: &str) {
            self.indicator.lock().unwrap().push(format!("display:{buffer}"));
        }
    }

    fn controller_with(
        form: MockForm,
        reply: LookupReply,
    ) -> (ScanController, UnboundedReceiver<ScanEvent>, Arc<Recorder>) {
        let forms: Arc<dyn FormFields> = Arc::new(form);
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(
            Arc::new(FixedLookup(reply)),
            Arc::new(NoRender),
            Arc::clone(&forms),
            Arc::clone(&recorder) as Arc<dyn Notifier>,
        );
        let submitter = FormSubmitter::new(
            Arc::clone(&recorder) as Arc<dyn SubmitClient>,
            Arc::clone(&forms),
            Arc::clone(&recorder) as Arc<dyn Notifier>,
        );
        let (controller, rx) = ScanController::new(
            ScannerSettings::default(),
            dispatcher,
            submitter,
            forms,
            Arc::clone(&recorder) as Arc<dyn Notifier>,
            Arc::clone(&recorder) as Arc<dyn ScanIndicator>,
        );
        (controller, rx, recorder)
    }

    fn controller() -> (ScanController, UnboundedReceiver<ScanEvent>, Arc<Recorder>) {
        controller_with(MockForm::new(), LookupReply::Rejected("unused".to_string()))
    }

    fn receipt_form(item: &str, quantity: &str) -> FormSnapshot {
        FormSnapshot {
            action: "/receipts".to_string(),
            values: vec![
                ("receipt_item".to_string(), item.to_string()),
                ("quantity".to_string(), quantity.to_string()),
            ],
            required: vec!["receipt_item".to_string(), "quantity".to_string()],
        }
    }

    async fn type_burst(c: &mut ScanController, text: &str) {
        let at = Instant::now();
        for ch in text.chars() {
            let key = ch.to_string();
            c.handle(ScanEvent::Key {
                key: key.clone(),
                phase: KeyPhase::Down,
                at,
            })
            .await;
            c.handle(ScanEvent::Key {
                key,
                phase: KeyPhase::Up,
                at,
            })
            .await;
        }
    }

    // ── Timer ─────────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_and_reports_timeout() {
        // Arrange
        let (mut c, mut rx, recorder) = controller();
        c.start(None).await;

        // Act – paused clock auto-advances to the sleeping timer.
        let event = rx.recv().await.unwrap();
        let handled = c.handle(event).await;

        // Assert
        assert!(!c.is_scanning());
        assert_eq!(handled.outcome, Some(ScanOutcome::Failed(ScanError::Timeout)));
        let notes = recorder.notes.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "Scan timeout. Please try again.");
        assert_eq!(notes[0].severity, Severity::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_aborts_timer() {
        // Arrange
        let (mut c, mut rx, recorder) = controller();
        c.start(None).await;

        // Act
        let handled = c.key("Escape", KeyPhase::Down).await;
        tokio::time::advance(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;

        // Assert
        assert!(handled.suppress_default);
        assert!(handled.outcome.is_none());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert!(recorder.notes.lock().unwrap().is_empty());
        assert_eq!(
            recorder.indicator.lock().unwrap().as_slice(),
            &["show".to_string(), "hide".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_timer() {
        // Arrange
        let (mut c, mut rx, _) = controller();
        c.start(None).await;
        tokio::time::advance(Duration::from_secs(6)).await;

        // Act – second start; the first timer must never fire.
        c.start(None).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;

        // Assert
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert!(c.is_scanning());
    }

    // ── Target-routed mode ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_target_mode_writes_and_submits_once() {
        // Arrange
        let mut form = MockForm::new();
        form.expect_set_value()
            .withf(|field, value| field == "receipt_item" && value == "ITEM12345")
            .times(1)
            .return_const(true);
        form.expect_notify_change()
            .withf(|field| field == "receipt_item")
            .times(1)
            .return_const(());
        form.expect_is_auto_submit().times(1).return_const(true);
        form.expect_enclosing_form()
            .times(1)
            .return_const(Some(receipt_form("ITEM12345", "12")));
        form.expect_mark_invalid()
            .withf(|ids| ids.is_empty())
            .return_const(());
        form.expect_mark_submitted().times(1).return_const(());
        let (mut c, _rx, recorder) =
            controller_with(form, LookupReply::Rejected("unused".to_string()));

        // Act
        c.start(Some("receipt_item".to_string())).await;
        type_burst(&mut c, "ITEM12345").await;
        let handled = c.key("Enter", KeyPhase::Down).await;

        // Assert
        assert_eq!(
            handled.outcome,
            Some(ScanOutcome::Routed {
                field_id: "receipt_item".to_string(),
                submitted: true
            })
        );
        let messages: Vec<String> = recorder
            .notes
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect();
        assert_eq!(
            messages,
            ["Barcode scanned successfully", "Operation completed successfully"]
        );
        assert_eq!(
            recorder.submissions.lock().unwrap().as_slice(),
            &[(
                "/receipts".to_string(),
                json!({"receipt_item": "ITEM12345", "quantity": "12"})
            )]
        );
        assert_eq!(
            c.history().last().map(|e| e.target.as_deref()),
            Some(Some("receipt_item"))
        );
    }

    #[tokio::test]
    async fn test_target_mode_without_auto_submit_does_not_submit() {
        let mut form = MockForm::new();
        form.expect_set_value().return_const(true);
        form.expect_notify_change().return_const(());
        form.expect_is_auto_submit().return_const(false);
        form.expect_enclosing_form().times(0);
        let (mut c, _rx, _) = controller_with(form, LookupReply::Rejected("unused".to_string()));

        c.start(Some("qty".to_string())).await;
        let handled = c.handle(ScanEvent::Manual("SUP-123456".to_string())).await;

        assert_eq!(
            handled.outcome,
            Some(ScanOutcome::Routed {
                field_id: "qty".to_string(),
                submitted: false
            })
        );
    }

    #[tokio::test]
    async fn test_missing_target_field_is_skipped_quietly() {
        let mut form = MockForm::new();
        form.expect_set_value().return_const(false);
        form.expect_notify_change().times(0);
        form.expect_enclosing_form().times(0);
        let (mut c, _rx, recorder) =
            controller_with(form, LookupReply::Rejected("unused".to_string()));

        c.start(Some("gone".to_string())).await;
        type_burst(&mut c, "ITEM12345").await;
        c.key("Enter", KeyPhase::Down).await;

        assert!(recorder.notes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auto_submit_with_blank_required_field_is_not_sent() {
        // Arrange
        let mut form = MockForm::new();
        form.expect_set_value().return_const(true);
        form.expect_notify_change().return_const(());
        form.expect_is_auto_submit().return_const(true);
        form.expect_enclosing_form()
            .return_const(Some(receipt_form("ITEM12345", "")));
        form.expect_mark_invalid()
            .withf(|ids| ids == ["quantity".to_string()])
            .times(1)
            .return_const(());
        form.expect_mark_submitted().times(0);
        let (mut c, _rx, recorder) =
            controller_with(form, LookupReply::Rejected("unused".to_string()));

        // Act
        c.start(Some("receipt_item".to_string())).await;
        let handled = c.handle(ScanEvent::Manual("ITEM12345".to_string())).await;

        // Assert
        assert_eq!(
            handled.outcome,
            Some(ScanOutcome::Routed {
                field_id: "receipt_item".to_string(),
                submitted: false
            })
        );
        assert!(recorder.submissions.lock().unwrap().is_empty());
        let notes = recorder.notes.lock().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].message, "Please fill in all required fields");
        assert_eq!(notes[1].severity, Severity::Error);
    }

    // ── Classifier mode ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_supplier_scan_autofills_form() {
        // Arrange
        let info = SupplierInfo {
            item_code: Some("ITEM001".to_string()),
            batch_number: Some("B001-2024".to_string()),
            expiry_date: Some("2025-12-31".to_string()),
            supplier_barcode: None,
        };
        let mut form = MockForm::new();
        form.expect_set_value().times(3).return_const(true);
        form.expect_notify_change().times(3).return_const(());
        let (mut c, _rx, recorder) = controller_with(
            form,
            LookupReply::Found(LookupPayload::Supplier(info.clone())),
        );

        // Act
        c.start(None).await;
        type_burst(&mut c, "SUP-778899").await;
        let handled = c.key("Enter", KeyPhase::Down).await;

        // Assert
        assert_eq!(
            handled.outcome,
            Some(ScanOutcome::Found(LookupPayload::Supplier(info)))
        );
        assert!(!c.is_scanning());
        assert_eq!(
            recorder.notes.lock().unwrap()[0].message,
            "Supplier barcode processed"
        );
    }

    #[tokio::test]
    async fn test_invalid_scan_reports_format_error() {
        let (mut c, _rx, recorder) = controller();

        c.start(None).await;
        type_burst(&mut c, "AB").await;
        let handled = c.key("Enter", KeyPhase::Down).await;

        assert_eq!(
            handled.outcome,
            Some(ScanOutcome::Failed(ScanError::InvalidFormat))
        );
        assert!(c.history().is_empty());
        assert_eq!(
            recorder.notes.lock().unwrap()[0].message,
            "Invalid barcode format"
        );
    }

    #[tokio::test]
    async fn test_unrecognized_scan_is_recorded_and_reported() {
        let (mut c, _rx, recorder) = controller();

        c.start(None).await;
        type_burst(&mut c, "XYZ999").await;
        c.handle(ScanEvent::ProcessRequested).await;

        assert_eq!(c.history().len(), 1);
        assert_eq!(
            recorder.notes.lock().unwrap()[0].message,
            "Barcode type not recognized"
        );
    }

    #[tokio::test]
    async fn test_indicator_tracks_buffer() {
        let (mut c, _rx, recorder) = controller();

        c.start(None).await;
        type_burst(&mut c, "PO").await;
        c.stop().await;

        assert_eq!(
            recorder.indicator.lock().unwrap().as_slice(),
            &[
                "show".to_string(),
                "display:P".to_string(),
                "display:PO".to_string(),
                "hide".to_string(),
            ]
        );
    }
}
