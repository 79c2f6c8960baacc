//! Barcode validation and prefix classification.
//!
//! Both operations are pure functions over a string: no I/O, no allocation
//! beyond what the caller passes in.
//!
//! # Validation
//!
//! A scanned string is accepted when, after trimming surrounding whitespace,
//! it is between [`BarcodeRules::min_length`] and [`BarcodeRules::max_length`]
//! characters long and every character is an ASCII letter, digit, `-`, `_`,
//! or `.`.
//!
//! # Classification
//!
//! Prefix rules are evaluated in a fixed priority order and the first match
//! wins.  The rules overlap (`"POITEM1"` starts with both `PO` and, after the
//! first two characters, `ITEM`), so the order is part of the contract:
//!
//! | Priority | Prefixes          | Kind                             |
//! |----------|-------------------|----------------------------------|
//! | 1        | `PO-`, `PO`       | [`BarcodeKind::PurchaseOrder`]   |
//! | 2        | `ITEM`, `ITM`     | [`BarcodeKind::ItemCode`]        |
//! | 3        | `SUP-`, `S-`      | [`BarcodeKind::SupplierBarcode`] |
//! | –        | anything else     | [`BarcodeKind::Unrecognized`]    |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default minimum barcode length in characters.
pub const DEFAULT_MIN_LENGTH: usize = 6;

/// Default maximum barcode length in characters.
pub const DEFAULT_MAX_LENGTH: usize = 50;

/// Prefix table in priority order.
const PREFIX_RULES: &[(&[&str], BarcodeKind)] = &[
    (&["PO-", "PO"], BarcodeKind::PurchaseOrder),
    (&["ITEM", "ITM"], BarcodeKind::ItemCode),
    (&["SUP-", "S-"], BarcodeKind::SupplierBarcode),
];

/// The handling category of a validated barcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeKind {
    /// A purchase order number (`PO-…` / `PO…`).
    PurchaseOrder,
    /// An internal item code (`ITEM…` / `ITM…`).
    ItemCode,
    /// A barcode printed by a supplier (`SUP-…` / `S-…`).
    SupplierBarcode,
    /// No prefix rule matched; reported to the user, never dispatched.
    Unrecognized,
}

impl BarcodeKind {
    /// Returns `true` for kinds that have a lookup endpoint.
    pub fn is_dispatchable(self) -> bool {
        !matches!(self, BarcodeKind::Unrecognized)
    }
}

impl fmt::Display for BarcodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BarcodeKind::PurchaseOrder => "purchase order",
            BarcodeKind::ItemCode => "item code",
            BarcodeKind::SupplierBarcode => "supplier barcode",
            BarcodeKind::Unrecognized => "unrecognized",
        };
        f.write_str(label)
    }
}

/// Length bounds applied by [`BarcodeRules::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeRules {
    /// Minimum accepted length (inclusive).
    pub min_length: usize,
    /// Maximum accepted length (inclusive).
    pub max_length: usize,
}

impl Default for BarcodeRules {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl BarcodeRules {
    /// Returns `true` when `raw`, trimmed, satisfies the length bounds and
    /// the `[A-Za-z0-9\-_.]` character set.
    pub fn validate(&self, raw: &str) -> bool {
        let barcode = raw.trim();
        let len = barcode.chars().count();
        if len < self.min_length || len > self.max_length {
            return false;
        }
        barcode.chars().all(is_allowed_char)
    }
}

/// Validates `raw` against the default [`BarcodeRules`].
///
/// # Examples
///
/// ```rust
/// use wms_scan_core::validate;
///
/// assert!(validate("ITEM12345"));
/// assert!(!validate("AB"));
/// assert!(!validate("PO#1234"));
/// ```
pub fn validate(raw: &str) -> bool {
    BarcodeRules::default().validate(raw)
}

/// Classifies a barcode by prefix.  First matching rule wins.
///
/// # Examples
///
/// ```rust
/// use wms_scan_core::{classify, BarcodeKind};
///
/// assert_eq!(classify("PO-12345"), BarcodeKind::PurchaseOrder);
/// assert_eq!(classify("XYZ999"), BarcodeKind::Unrecognized);
/// ```
pub fn classify(barcode: &str) -> BarcodeKind {
    let barcode = barcode.trim();
    PREFIX_RULES
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|p| barcode.starts_with(p)))
        .map(|(_, kind)| *kind)
        .unwrap_or(BarcodeKind::Unrecognized)
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

// ── Tests ─────────────────────────────────────────────────────────────────────
