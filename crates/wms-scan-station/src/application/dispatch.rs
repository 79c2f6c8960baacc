//! Dispatcher: looks up a classified barcode and presents the response.
//!
//! Each dispatchable [`BarcodeKind`] maps to exactly one lookup request.  The
//! response falls into one of three cases:
//!
//! | Response                                | Result                          |
//! |-----------------------------------------|---------------------------------|
//! | success envelope with an `error` field  | `ScanError::ServerReported`     |
//! | success envelope with a payload         | render panel (+ supplier fill)  |
//! | network / HTTP / decode failure         | `ScanError::TransportFailure`   |
//!
//! Nothing is retried.  A failed lookup requires a fresh scan.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use wms_scan_core::{BarcodeKind, LookupPayload, Notification, ScanError, SupplierInfo};

use super::ports::{FormFields, Notifier, PanelRenderer};

/// Errors raised by a [`LookupClient`] before a usable reply exists.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The request never produced a 2xx response.
    #[error("lookup transport error: {0}")]
    Transport(String),

    /// The 2xx response body did not match the expected payload shape.
    #[error("malformed lookup response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The kind has no lookup endpoint.
    #[error("no lookup endpoint for {0} barcodes")]
    UnsupportedKind(BarcodeKind),
}

/// A 2xx lookup response.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupReply {
    /// The backend found the record.
    Found(LookupPayload),
    /// The backend answered with an `error` field.
    Rejected(String),
}

impl LookupReply {
    /// Interprets a decoded JSON envelope for `kind`.
    ///
    /// A truthy `error` field wins over any payload fields present alongside it.
    ///
    /// # Errors
    ///
    /// [`LookupError::Decode`] if the payload fields have the wrong types,
    /// [`LookupError::UnsupportedKind`] for [`BarcodeKind::Unrecognized`].
    pub fn from_envelope(kind: BarcodeKind, envelope: Value) -> Result<Self, LookupError> {
        if let Some(err) = envelope.get("error").filter(|v| is_truthy(v)) {
            let message = match err {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Ok(LookupReply::Rejected(message));
        }

        let payload = match kind {
            BarcodeKind::PurchaseOrder => {
                LookupPayload::PurchaseOrder(serde_json::from_value(envelope)?)
            }
            BarcodeKind::ItemCode => LookupPayload::Item(serde_json::from_value(envelope)?),
            BarcodeKind::SupplierBarcode => {
                LookupPayload::Supplier(serde_json::from_value(envelope)?)
            }
            BarcodeKind::Unrecognized => return Err(LookupError::UnsupportedKind(kind)),
        };
        Ok(LookupReply::Found(payload))
    }
}

/// JSON truthiness as the backend's clients have always applied it.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Name of the single JSON field carrying the barcode in each lookup request.
pub fn request_field(kind: BarcodeKind) -> Option<&'static str> {
    match kind {
        BarcodeKind::PurchaseOrder => Some("po_number"),
        BarcodeKind::ItemCode => Some("item_code"),
        BarcodeKind::SupplierBarcode => Some("barcode"),
        BarcodeKind::Unrecognized => None,
    }
}

/// Builds the request body for `kind`, e.g. `{"po_number": "PO-12345"}`.
pub fn request_body(kind: BarcodeKind, barcode: &str) -> Option<Value> {
    request_field(kind).map(|field| {
        let mut body = serde_json::Map::new();
        body.insert(field.to_string(), Value::String(barcode.to_string()));
        Value::Object(body)
    })
}

fn success_message(kind: BarcodeKind) -> &'static str {
    match kind {
        BarcodeKind::PurchaseOrder => "PO information loaded",
        BarcodeKind::ItemCode => "Item information loaded",
        BarcodeKind::SupplierBarcode => "Supplier barcode processed",
        BarcodeKind::Unrecognized => "Barcode processed",
    }
}

/// Port for the remote lookup endpoints.
///
/// The infrastructure implementation POSTs JSON over HTTP; tests use
/// recording doubles.
#[async_trait]
pub trait LookupClient: Send + Sync {
    /// Issues the lookup for `kind` and waits for its single response.
    async fn lookup(&self, kind: BarcodeKind, barcode: &str) -> Result<LookupReply, LookupError>;
}

/// Runs lookups and presents their results.
#[derive(Clone)]
pub struct Dispatcher {
    lookup: Arc<dyn LookupClient>,
    renderer: Arc<dyn PanelRenderer>,
    forms: Arc<dyn FormFields>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(
        lookup: Arc<dyn LookupClient>,
        renderer: Arc<dyn PanelRenderer>,
        forms: Arc<dyn FormFields>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            lookup,
            renderer,
            forms,
            notifier,
        }
    }

    /// Looks `barcode` up as `kind`, renders or reports the outcome, and
    /// returns it.  Exactly one notification is emitted per call.
    pub async fn dispatch(
        &self,
        kind: BarcodeKind,
        barcode: &str,
    ) -> Result<LookupPayload, ScanError> {
        let result = self.run_lookup(kind, barcode).await;

        match &result {
            Ok(payload) => {
                self.present(payload);
                self.notifier.notify(Notification::success(success_message(kind)));
            }
            Err(err) => self.notifier.notify(Notification::from(err)),
        }
        result
    }

    async fn run_lookup(
        &self,
        kind: BarcodeKind,
        barcode: &str,
    ) -> Result<LookupPayload, ScanError> {
        if !kind.is_dispatchable() {
            return Err(ScanError::Unrecognized);
        }

        info!(%kind, %barcode, "dispatching lookup");
        match self.lookup.lookup(kind, barcode).await {
            Ok(LookupReply::Found(payload)) => Ok(payload),
            Ok(LookupReply::Rejected(message)) => {
                warn!(%kind, %barcode, %message, "lookup rejected by server");
                Err(ScanError::ServerReported(message))
            }
            Err(e) => {
                warn!(%kind, %barcode, "lookup failed: {e}");
                Err(ScanError::TransportFailure(kind))
            }
        }
    }

    fn present(&self, payload: &LookupPayload) {
        self.renderer.render(payload);
        if let LookupPayload::Supplier(info) = payload {
            self.autofill_supplier(info);
        }
    }

    /// Writes each non-empty supplier value into its form field and fires a
    /// change notification for it.  Fields without a value are left untouched.
    fn autofill_supplier(&self, info: &SupplierInfo) {
        for (field_id, value) in info.autofill_values() {
            if self.forms.set_value(field_id, value) {
                self.forms.notify_change(field_id);
                debug!(field_id, value, "supplier field auto-filled");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
