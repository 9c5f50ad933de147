// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use stride_core::{RecordId, SyncFailure};

fn report() -> CycleReport {
    let mut report = CycleReport::new(CycleOutcome::Completed);
    report.synced = vec![RecordId::new("rec-1"), RecordId::new("rec-2")];
    report
}

#[test]
fn test_text_clean_cycle() {
    assert_eq!(format_text(&report()), "Synced 2 items\n");
}

#[test]
fn test_text_lists_failures_and_notes() {
    let mut report = report();
    report.failed = vec![(RecordId::new("rec-3"), SyncFailure::permanent("unknown video"))];
    report.resent = 1;
    report.skipped = 2;
    report.unconfirmed = 1;

    let out = format_text(&report);
    assert!(out.contains("Failed rec-3: unknown video (permanent)\n"));
    assert!(out.contains("1 item resent after an interrupted sync\n"));
    assert!(out.contains("2 items need attention"));
    assert!(out.contains("1 item got no answer from the remote\n"));
    assert!(!out.contains("deferred"));
}

#[test]
fn test_json_summary() {
    let mut report = report();
    report.failed = vec![(RecordId::new("rec-3"), SyncFailure::transient("database busy"))];
    report.deferred = 1;

    let json: serde_json::Value = serde_json::from_str(&format_json(&report).unwrap()).unwrap();
    assert_eq!(json["synced"], 2);
    assert_eq!(json["failed"][0]["id"], "rec-3");
    assert_eq!(json["failed"][0]["reason"], "database busy");
    assert_eq!(json["deferred"], 1);
    assert_eq!(json["unconfirmed"], 0);
}
