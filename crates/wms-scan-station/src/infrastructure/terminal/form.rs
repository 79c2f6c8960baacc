//! In-memory form backing the [`FormFields`] port.
//!
//! The station has no HTML page, so the "form" being filled in is a set of
//! named fields declared in the config file, all enclosed by one form that
//! posts to a configured action path.  Every change, failed validation, and
//! accepted submission is recorded as a [`FormEvent`] so the operator (and
//! tests) can see what happened.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::application::form_submit::FormSnapshot;
use crate::application::ports::FormFields;
use crate::infrastructure::storage::config::FormFieldEntry;

/// Action path used when none is configured.
pub const DEFAULT_FORM_ACTION: &str = "/";

/// Something that happened to the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    Changed { field_id: String, value: String },
    Invalid { field_ids: Vec<String> },
    Submitted { values: Vec<(String, String)> },
}

#[derive(Debug, Default)]
struct FieldState {
    value: String,
    auto_submit: bool,
    required: bool,
    invalid: bool,
}

#[derive(Debug, Default)]
struct FormState {
    action: String,
    /// Field ids in declaration order.
    order: Vec<String>,
    fields: HashMap<String, FieldState>,
    events: Vec<FormEvent>,
}

impl FormState {
    fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            action: self.action.clone(),
            values: self
                .order
                .iter()
                .map(|id| {
                    let value = self
                        .fields
                        .get(id)
                        .map(|f| f.value.clone())
                        .unwrap_or_default();
                    (id.clone(), value)
                })
                .collect(),
            required: self
                .order
                .iter()
                .filter(|id| self.fields.get(*id).is_some_and(|f| f.required))
                .cloned()
                .collect(),
        }
    }
}

/// A single form whose fields are all enclosed by it.
#[derive(Debug)]
pub struct InMemoryForm {
    state: Mutex<FormState>,
}

impl InMemoryForm {
    /// Declares `fields` on a form posting to [`DEFAULT_FORM_ACTION`].  The
    /// first declaration of a repeated id wins.
    pub fn new(fields: &[FormFieldEntry]) -> Self {
        let mut state = FormState {
            action: DEFAULT_FORM_ACTION.to_string(),
            ..FormState::default()
        };
        for entry in fields {
            if state.fields.contains_key(&entry.id) {
                continue;
            }
            state.order.push(entry.id.clone());
            state.fields.insert(
                entry.id.clone(),
                FieldState {
                    auto_submit: entry.auto_submit,
                    required: entry.required,
                    ..FieldState::default()
                },
            );
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Sets the path the form posts to.
    pub fn with_action(self, action: impl Into<String>) -> Self {
        self.with_state(|s| s.action = action.into());
        self
    }

    pub fn value(&self, field_id: &str) -> Option<String> {
        self.with_state(|s| s.fields.get(field_id).map(|f| f.value.clone()))
    }

    /// Field values in declaration order.
    pub fn values(&self) -> Vec<(String, String)> {
        self.with_state(|s| s.snapshot().values)
    }

    /// Whether `field_id` failed the last validation.
    pub fn is_invalid(&self, field_id: &str) -> bool {
        self.with_state(|s| s.fields.get(field_id).is_some_and(|f| f.invalid))
    }

    /// Every change, rejection, and submission so far, oldest first.
    pub fn events(&self) -> Vec<FormEvent> {
        self.with_state(|s| s.events.clone())
    }

    pub fn submission_count(&self) -> usize {
        self.with_state(|s| {
            s.events
                .iter()
                .filter(|e| matches!(e, FormEvent::Submitted { .. }))
                .count()
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FormState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl Default for InMemoryForm {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl FormFields for InMemoryForm {
    fn set_value(&self, field_id: &str, value: &str) -> bool {
        self.with_state(|s| match s.fields.get_mut(field_id) {
            Some(field) => {
                field.value = value.to_string();
                true
            }
            None => false,
        })
    }

    fn notify_change(&self, field_id: &str) {
        self.with_state(|s| {
            let value = s
                .fields
                .get(field_id)
                .map(|f| f.value.clone())
                .unwrap_or_default();
            debug!(field_id, %value, "form field changed");
            s.events.push(FormEvent::Changed {
                field_id: field_id.to_string(),
                value,
            });
        });
    }

    fn is_auto_submit(&self, field_id: &str) -> bool {
        self.with_state(|s| s.fields.get(field_id).is_some_and(|f| f.auto_submit))
    }

    fn enclosing_form(&self, field_id: &str) -> Option<FormSnapshot> {
        self.with_state(|s| s.fields.contains_key(field_id).then(|| s.snapshot()))
    }

    fn mark_invalid(&self, field_ids: &[String]) {
        self.with_state(|s| {
            for (id, field) in s.fields.iter_mut() {
                field.invalid = field_ids.contains(id);
            }
            if !field_ids.is_empty() {
                s.events.push(FormEvent::Invalid {
                    field_ids: field_ids.to_vec(),
                });
            }
        });
    }

    fn mark_submitted(&self, snapshot: &FormSnapshot) {
        self.with_state(|s| {
            info!(
                action = %snapshot.action,
                fields = snapshot.values.len(),
                "form submission recorded"
            );
            s.events.push(FormEvent::Submitted {
                values: snapshot.values.clone(),
            });
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
