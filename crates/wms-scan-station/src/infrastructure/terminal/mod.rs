//! Terminal presentation for the scan station.
//!
//! [`TerminalUi`] implements the three output ports ([`Notifier`],
//! [`ScanIndicator`], [`PanelRenderer`]) by writing plain text lines to any
//! `Write` sink, stdout in production and an in-memory buffer in tests.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::warn;

use wms_scan_core::{
    ItemInfo, LookupPayload, Notification, PurchaseOrderInfo, ScanHistory, Severity, SupplierInfo,
};

use crate::application::ports::{Notifier, PanelRenderer, ScanIndicator};

pub mod form;

/// Line-oriented terminal output.
pub struct TerminalUi {
    out: Mutex<Box<dyn Write + Send>>,
}

impl TerminalUi {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Prints every history entry, oldest first.
    pub fn print_history(&self, history: &ScanHistory) {
        if history.is_empty() {
            self.emit("No scans recorded.");
            return;
        }
        let mut text = format!("Scan history ({} entries):", history.len());
        for (n, entry) in history.entries().iter().enumerate() {
            text.push_str(&format!(
                "\n  {:>3}. {}  {}",
                n + 1,
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.barcode
            ));
            if let Some(target) = &entry.target {
                text.push_str(&format!("  -> {target}"));
            }
        }
        self.emit(&text);
    }

    /// Writes one block of text followed by a newline.
    pub fn emit(&self, text: &str) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{text}").and_then(|_| out.flush()) {
            warn!("terminal write failed: {e}");
        }
    }
}

impl Notifier for TerminalUi {
    fn notify(&self, notification: Notification) {
        self.emit(&format!(
            "[{}] {}",
            severity_label(notification.severity),
            notification.message
        ));
    }
}

impl ScanIndicator for TerminalUi {
    fn show(&self) {
        self.emit("Scanning barcode... (Esc or :stop to cancel)");
    }

    fn hide(&self) {
        self.emit("Scanning finished.");
    }

    fn update_display(&self, buffer: &str) {
        self.emit(&format!("  > {buffer}"));
    }
}

impl PanelRenderer for TerminalUi {
    fn render(&self, payload: &LookupPayload) {
        let panel = match payload {
            LookupPayload::PurchaseOrder(po) => purchase_order_panel(po),
            LookupPayload::Item(item) => item_panel(item),
            LookupPayload::Supplier(info) => supplier_panel(info),
        };
        self.emit(&panel);
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Success => "success",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

// ── Panels ────────────────────────────────────────────────────────────────────

fn purchase_order_panel(po: &PurchaseOrderInfo) -> String {
    format!(
        "PO Information\n  PO Number: {}\n  Supplier:  {}\n  Date:      {}\n  Lines:     {}",
        po.po_number,
        po.supplier_name,
        po.po_date,
        po.lines.len()
    )
}

fn item_panel(item: &ItemInfo) -> String {
    format!(
        "Item Information\n  Item Code:   {}\n  Description: {}\n  Unit Price:  {}\n  Stock Level: {}",
        item.item_code,
        item.description,
        format_currency(item.unit_price),
        item.stock_level
    )
}

fn supplier_panel(info: &SupplierInfo) -> String {
    let show = |v: &Option<String>| v.as_deref().unwrap_or("-").to_string();
    format!(
        "Supplier Barcode Information\n  Item Code:     {}\n  Batch Number:  {}\n  Expiry Date:   {}\n  Supplier Code: {}",
        show(&info.item_code),
        show(&info.batch_number),
        show(&info.expiry_date),
        show(&info.supplier_barcode)
    )
}

/// Formats `amount` as US dollars: `$1,234.50`, `-$0.35`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// A cloneable in-memory sink, handy for capturing [`TerminalUi`] output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = match self.0.lock() {
            Ok(b) => b.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut inner) => inner.extend_from_slice(buf),
            Err(poisoned) => poisoned.into_inner().extend_from_slice(buf),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
