//! HTTP implementation of the [`LookupClient`] port.
//!
//! One POST per lookup, with a single-field JSON body:
//!
//! | Kind             | Default path        | Body                  |
//! |------------------|---------------------|-----------------------|
//! | purchase order   | `/api/scan_po`      | `{"po_number": ...}`  |
//! | item code        | `/api/scan_item`    | `{"item_code": ...}`  |
//! | supplier barcode | `/api/scan_barcode` | `{"barcode": ...}`    |

use async_trait::async_trait;
use serde_json::Value;

use wms_scan_core::BarcodeKind;

use super::ApiClient;
use crate::application::dispatch::{request_body, LookupClient, LookupError, LookupReply};

/// Paths of the three lookup endpoints, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEndpoints {
    pub purchase_order: String,
    pub item: String,
    pub supplier: String,
}

impl Default for LookupEndpoints {
    fn default() -> Self {
        Self {
            purchase_order: "/api/scan_po".to_string(),
            item: "/api/scan_item".to_string(),
            supplier: "/api/scan_barcode".to_string(),
        }
    }
}

impl LookupEndpoints {
    pub fn path_for(&self, kind: BarcodeKind) -> Option<&str> {
        match kind {
            BarcodeKind::PurchaseOrder => Some(self.purchase_order.as_str()),
            BarcodeKind::ItemCode => Some(self.item.as_str()),
            BarcodeKind::SupplierBarcode => Some(self.supplier.as_str()),
            BarcodeKind::Unrecognized => None,
        }
    }
}

/// Looks barcodes up against the WMS backend.
#[derive(Debug, Clone)]
pub struct HttpLookupClient {
    api: ApiClient,
    endpoints: LookupEndpoints,
}

impl HttpLookupClient {
    pub fn new(api: ApiClient, endpoints: LookupEndpoints) -> Self {
        Self { api, endpoints }
    }
}

#[async_trait]
impl LookupClient for HttpLookupClient {
    async fn lookup(&self, kind: BarcodeKind, barcode: &str) -> Result<LookupReply, LookupError> {
        let (Some(path), Some(body)) = (self.endpoints.path_for(kind), request_body(kind, barcode))
        else {
            return Err(LookupError::UnsupportedKind(kind));
        };

        let envelope: Value = self
            .api
            .post(path, &body)
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        LookupReply::from_envelope(kind, envelope)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
