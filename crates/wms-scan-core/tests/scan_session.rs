//! Integration tests for the scan capture state machine.
//!
//! These drive [`ScanMachine`] through the public API only, the same way the
//! station controller does: feed events, inspect effects, inspect history.

use std::time::{Duration, Instant};

use wms_scan_core::{
    classify, validate, BarcodeKind, KeyPhase, ScanEffect, ScanError, ScanEvent, ScanMachine,
    ScanState,
};

/// Types `text` as a fast scanner would: key-down then key-up per character,
/// 3 ms apart, starting at `t0`.
fn scanner_burst(machine: &mut ScanMachine, text: &str, t0: Instant) -> Vec<ScanEffect> {
    let mut effects = Vec::new();
    for (i, c) in text.chars().enumerate() {
        let at = t0 + Duration::from_millis(3 * i as u64);
        let key = c.to_string();
        effects.extend(machine.handle(ScanEvent::Key {
            key: key.clone(),
            phase: KeyPhase::Down,
            at,
        }));
        effects.extend(machine.handle(ScanEvent::Key {
            key,
            phase: KeyPhase::Up,
            at,
        }));
    }
    effects
}

fn press(machine: &mut ScanMachine, key: &str) -> Vec<ScanEffect> {
    machine.handle(ScanEvent::Key {
        key: key.to_string(),
        phase: KeyPhase::Down,
        at: Instant::now(),
    })
}

fn start(machine: &mut ScanMachine, target: Option<&str>) -> Vec<ScanEffect> {
    machine.handle(ScanEvent::Start {
        target: target.map(str::to_string),
        at: Instant::now(),
    })
}

#[test]
fn test_validation_examples() {
    assert!(validate("ITEM12345"));
    assert!(!validate("AB"));
    assert!(!validate("PO#1234"));
}

#[test]
fn test_every_disallowed_ascii_character_fails_validation() {
    for byte in 0x20u8..0x7F {
        let c = byte as char;
        let allowed = c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
        if c == ' ' {
            // Interior space: still outside the character set.
            assert!(!validate("ABC DEF"));
            continue;
        }
        let candidate = format!("ABC{c}DEF");
        assert_eq!(validate(&candidate), allowed, "character {c:?}");
    }
}

#[test]
fn test_length_boundaries() {
    for len in 0..=60 {
        let candidate = "A".repeat(len);
        assert_eq!(validate(&candidate), (6..=50).contains(&len), "length {len}");
    }
}

#[test]
fn test_classification_priority() {
    assert_eq!(classify("PO-12345"), BarcodeKind::PurchaseOrder);
    assert_eq!(classify("ITM77"), BarcodeKind::ItemCode);
    assert_eq!(classify("S-9"), BarcodeKind::SupplierBarcode);
    assert_eq!(classify("XYZ999"), BarcodeKind::Unrecognized);
    assert_eq!(classify("POITEM"), BarcodeKind::PurchaseOrder);
}

#[test]
fn test_cancel_always_returns_to_idle_with_no_history() {
    for contents in ["", "A", "PO-12345", "ITEM-VALID-CODE-0001"] {
        // Arrange
        let mut machine = ScanMachine::default();
        start(&mut machine, None);
        scanner_burst(&mut machine, contents, Instant::now());

        // Act
        press(&mut machine, "Escape");

        // Assert
        assert_eq!(machine.state(), ScanState::Idle, "contents {contents:?}");
        assert!(machine.buffer().is_none());
        assert!(machine.history().is_empty());
    }
}

#[test]
fn test_timeout_after_terminator_is_a_no_op() {
    // Arrange
    let mut machine = ScanMachine::default();
    start(&mut machine, None);
    let generation = machine.generation();
    scanner_burst(&mut machine, "PO-12345", Instant::now());
    let completion = press(&mut machine, "Enter");
    assert!(completion
        .iter()
        .any(|e| matches!(e, ScanEffect::Dispatch { .. })));

    // Act – the timer lost the race but fires anyway.
    let late = machine.handle(ScanEvent::TimeoutElapsed { generation });

    // Assert
    assert!(late.is_empty(), "late timeout must not produce effects");
    assert_eq!(machine.history().len(), 1, "no duplicate history entry");
    assert_eq!(machine.state(), ScanState::Idle);
}

#[test]
fn test_stale_timeout_does_not_end_a_later_session() {
    // Arrange – first session is cancelled, second is in progress.
    let mut machine = ScanMachine::default();
    start(&mut machine, None);
    let stale = machine.generation();
    press(&mut machine, "Escape");
    start(&mut machine, None);
    scanner_burst(&mut machine, "ITEM", Instant::now());

    // Act
    let effects = machine.handle(ScanEvent::TimeoutElapsed { generation: stale });

    // Assert
    assert!(effects.is_empty());
    assert_eq!(machine.buffer(), Some("ITEM"));
}

#[test]
fn test_timeout_reports_failure_once() {
    let mut machine = ScanMachine::default();
    start(&mut machine, None);
    let generation = machine.generation();

    let first = machine.handle(ScanEvent::TimeoutElapsed { generation });
    let second = machine.handle(ScanEvent::TimeoutElapsed { generation });

    assert_eq!(
        first.iter().filter(|e| **e == ScanEffect::Failed(ScanError::Timeout)).count(),
        1
    );
    assert!(second.is_empty());
}

#[test]
fn test_restart_never_leaks_buffer_between_sessions() {
    // Arrange
    let mut machine = ScanMachine::default();
    start(&mut machine, None);
    scanner_burst(&mut machine, "AAA", Instant::now());

    // Act
    start(&mut machine, None);
    scanner_burst(&mut machine, "BCDEFG", Instant::now());
    let effects = press(&mut machine, "Enter");

    // Assert – BCDEFG is unrecognized, so it is recorded but not dispatched.
    assert_eq!(machine.history().len(), 1);
    assert_eq!(machine.history().entries()[0].barcode, "BCDEFG");
    assert_eq!(
        effects.last(),
        Some(&ScanEffect::Failed(ScanError::Unrecognized))
    );
}

#[test]
fn test_each_start_disarms_before_arming() {
    let mut machine = ScanMachine::default();
    start(&mut machine, None);

    let effects = start(&mut machine, None);

    let disarm = effects.iter().position(|e| *e == ScanEffect::DisarmTimeout);
    let arm = effects
        .iter()
        .position(|e| matches!(e, ScanEffect::ArmTimeout { .. }));
    assert!(disarm.is_some() && arm.is_some());
    assert!(disarm < arm, "old timer must be disarmed before the new one is armed");
}

#[test]
fn test_sequential_scans_each_get_a_history_entry() {
    let mut machine = ScanMachine::default();

    for code in ["PO-100001", "ITEM200002", "SUP-300003"] {
        start(&mut machine, None);
        scanner_burst(&mut machine, code, Instant::now());
        press(&mut machine, "Enter");
    }

    let barcodes: Vec<&str> = machine
        .history()
        .entries()
        .iter()
        .map(|e| e.barcode.as_str())
        .collect();
    assert_eq!(barcodes, vec!["PO-100001", "ITEM200002", "SUP-300003"]);
}
