//! Payloads returned by the warehouse lookup endpoints.
//!
//! Each classified barcode kind has its own endpoint and its own response
//! shape.  Every field is defaulted so that a partially populated response
//! still deserialises; missing values simply render as empty.

use serde::{Deserialize, Serialize};

use super::barcode::BarcodeKind;

/// Form field ids populated from a supplier barcode lookup, in fill order.
pub const SUPPLIER_AUTOFILL_FIELDS: [&str; 4] =
    ["batch_number", "expiry_date", "supplier_barcode", "item_code"];

/// Response of the purchase-order lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseOrderInfo {
    pub po_number: String,
    pub supplier_name: String,
    /// ISO date as sent by the backend; not reparsed.
    pub po_date: String,
    pub lines: Vec<PurchaseOrderLine>,
}

/// One line of a purchase order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseOrderLine {
    pub id: Option<i64>,
    pub item_code: String,
    pub item_description: String,
    pub ordered_quantity: f64,
    pub received_quantity: f64,
    pub open_quantity: f64,
    pub unit_of_measure: String,
    pub unit_price: f64,
}

/// Response of the item-code lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemInfo {
    pub item_code: String,
    pub description: String,
    pub unit_price: f64,
    pub stock_level: f64,
}

/// Response of the supplier-barcode lookup.
///
/// Fields are optional because the backend only fills what it could decode
/// from the supplier's label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplierInfo {
    pub item_code: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<String>,
    pub supplier_barcode: Option<String>,
}

impl SupplierInfo {
    /// Field id / value pairs that should be written into the receiving form.
    ///
    /// Only non-empty values are returned, in [`SUPPLIER_AUTOFILL_FIELDS`] order.
    pub fn autofill_values(&self) -> Vec<(&'static str, &str)> {
        let values = [
            self.batch_number.as_deref(),
            self.expiry_date.as_deref(),
            self.supplier_barcode.as_deref(),
            self.item_code.as_deref(),
        ];
        SUPPLIER_AUTOFILL_FIELDS
            .iter()
            .zip(values)
            .filter_map(|(field, value)| match value {
                Some(v) if !v.is_empty() => Some((*field, v)),
                _ => None,
            })
            .collect()
    }
}

/// A successful lookup response, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupPayload {
    PurchaseOrder(PurchaseOrderInfo),
    Item(ItemInfo),
    Supplier(SupplierInfo),
}

impl LookupPayload {
    pub fn kind(&self) -> BarcodeKind {
        match self {
            LookupPayload::PurchaseOrder(_) => BarcodeKind::PurchaseOrder,
            LookupPayload::Item(_) => BarcodeKind::ItemCode,
            LookupPayload::Supplier(_) => BarcodeKind::SupplierBarcode,
        }
    }
}
