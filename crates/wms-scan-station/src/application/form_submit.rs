//! Form submission: validates the enclosing form and posts it to the backend.
//!
//! When a target-routed scan lands in an auto-submit field, the form that
//! holds the field is submitted through [`FormSubmitter::submit`]:
//!
//! 1. Take a [`FormSnapshot`] of the enclosing form.
//! 2. Every required field must hold a non-blank value.  Blank ones are
//!    flagged on the form and the operator is told to fill them in.
//! 3. The values are posted as one JSON object to the form's action path.
//! 4. The operator sees whether the backend accepted the submission.
//!
//! Like lookups, a failed submission is never retried.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use wms_scan_core::{Notification, Severity};

use super::ports::{FormFields, Notifier};

const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields";
const SUBMITTED_MESSAGE: &str = "Operation completed successfully";
const SUBMIT_FAILED_MESSAGE: &str = "An error occurred. Please try again.";

/// Errors raised by a [`SubmitClient`].
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request never produced a 2xx response.
    #[error("form submission transport error: {0}")]
    Transport(String),
}

/// Sends a form's values to the backend.
#[async_trait]
pub trait SubmitClient: Send + Sync {
    /// Posts `body` to `action` and returns the decoded reply.
    async fn submit(&self, action: &str, body: &Value) -> Result<Value, SubmitError>;
}

/// The state of one form at the moment it is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    /// Path the form posts to.
    pub action: String,
    /// Field values in declaration order.
    pub values: Vec<(String, String)>,
    /// Ids of the fields that must not be blank, in declaration order.
    pub required: Vec<String>,
}

impl FormSnapshot {
    /// Required fields whose value is empty after trimming.
    pub fn missing_required(&self) -> Vec<String> {
        self.required
            .iter()
            .filter(|id| {
                self.values
                    .iter()
                    .find(|(field_id, _)| field_id == *id)
                    .map_or(true, |(_, value)| value.trim().is_empty())
            })
            .cloned()
            .collect()
    }

    /// The request body: one JSON object keyed by field id.
    pub fn to_json(&self) -> Value {
        let fields: Map<String, Value> = self
            .values
            .iter()
            .map(|(id, value)| (id.clone(), Value::String(value.clone())))
            .collect();
        Value::Object(fields)
    }
}

/// How a submission attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The field is not inside a form; nothing was sent.
    NotInForm,
    /// Required fields were blank; nothing was sent.
    Incomplete { missing: Vec<String> },
    /// The backend accepted the values.
    Accepted,
    /// The request failed.
    Failed,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted)
    }
}

/// Validates and posts the form that encloses a field.
pub struct FormSubmitter {
    client: Arc<dyn SubmitClient>,
    forms: Arc<dyn FormFields>,
    notifier: Arc<dyn Notifier>,
}

impl FormSubmitter {
    pub fn new(
        client: Arc<dyn SubmitClient>,
        forms: Arc<dyn FormFields>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            forms,
            notifier,
        }
    }

    /// Submits the form enclosing `field_id`.  Emits exactly one notification
    /// unless the field has no form.
    pub async fn submit(&self, field_id: &str) -> SubmitOutcome {
        let Some(snapshot) = self.forms.enclosing_form(field_id) else {
            warn!(%field_id, "auto-submit field is not inside a form");
            return SubmitOutcome::NotInForm;
        };

        let missing = snapshot.missing_required();
        self.forms.mark_invalid(&missing);
        if !missing.is_empty() {
            warn!(?missing, "form has blank required fields, not submitted");
            self.notifier
                .notify(Notification::new(Severity::Error, REQUIRED_FIELDS_MESSAGE));
            return SubmitOutcome::Incomplete { missing };
        }

        match self.client.submit(&snapshot.action, &snapshot.to_json()).await {
            Ok(reply) => {
                debug!(?reply, "form submission reply");
                info!(
                    action = %snapshot.action,
                    fields = snapshot.values.len(),
                    "form submitted"
                );
                self.forms.mark_submitted(&snapshot);
                self.notifier.notify(Notification::success(SUBMITTED_MESSAGE));
                SubmitOutcome::Accepted
            }
            Err(e) => {
                warn!(action = %snapshot.action, "form submission failed: {e}");
                self.notifier
                    .notify(Notification::new(Severity::Error, SUBMIT_FAILED_MESSAGE));
                SubmitOutcome::Failed
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
