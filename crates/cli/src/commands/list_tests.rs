// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::{TimeZone, Utc};
use serde_json::json;
use stride_core::{RecordId, RecordKind, SyncFailure, SyncState};

fn record() -> QueuedRecord {
    QueuedRecord::new(
        RecordId::new("rec-0123456789abcdef"),
        RecordKind::Video,
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap(),
        json!({}),
    )
}

#[test]
fn test_pending_line() {
    assert_eq!(
        format_line(&record()),
        "rec-0123456789abcdef  video            pending    2024-01-10 12:00:00"
    );
}

#[test]
fn test_failed_line_shows_attempts_and_reason() {
    let failed = record()
        .transitioned(SyncState::InFlight, None)
        .unwrap()
        .transitioned(SyncState::Failed, Some(SyncFailure::transient("database busy")))
        .unwrap();

    let line = format_line(&failed);
    assert!(line.contains("failed"));
    assert!(line.ends_with("attempts: 1  database busy (transient)"));
}
