//! Ports: the traits the application layer talks to instead of concrete I/O.
//!
//! Every side effect the scan pipeline needs (showing a toast, lighting up the
//! capture indicator, writing into a form field, rendering a lookup panel) goes
//! through one of these traits.  The infrastructure layer provides the terminal
//! and in-memory implementations; tests provide recording doubles.
//!
//! All ports are `Send + Sync` so they can be shared behind `Arc` between the
//! controller and the dispatcher.

use wms_scan_core::{LookupPayload, Notification};

use super::form_submit::FormSnapshot;

/// Shows transient messages to the operator.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// The "scanning…" indicator and its live display of captured characters.
pub trait ScanIndicator: Send + Sync {
    fn show(&self);
    fn hide(&self);
    /// Replaces the live display with `buffer`.
    fn update_display(&self, buffer: &str);
}

/// Renders the info panel for a successful lookup.
pub trait PanelRenderer: Send + Sync {
    fn render(&self, payload: &LookupPayload);
}

/// Lookup-by-id access to the fields of the form being filled in.
pub trait FormFields: Send + Sync {
    /// Sets `field_id` to `value`.  Returns `false` if no such field exists.
    fn set_value(&self, field_id: &str, value: &str) -> bool;

    /// Fires the change notification for `field_id`.
    fn notify_change(&self, field_id: &str);

    /// Whether `field_id` is marked for auto-submission.
    fn is_auto_submit(&self, field_id: &str) -> bool;

    /// The current state of the form that encloses `field_id`, or `None` if
    /// the field is not inside a form.
    fn enclosing_form(&self, field_id: &str) -> Option<FormSnapshot>;

    /// Flags exactly `field_ids` as failing validation; every other field
    /// loses the flag.
    fn mark_invalid(&self, field_ids: &[String]);

    /// Records that the backend accepted `snapshot`.
    fn mark_submitted(&self, snapshot: &FormSnapshot);
}
