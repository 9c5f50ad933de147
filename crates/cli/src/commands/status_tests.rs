// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use stride_core::{RecordId, SyncFailure};

fn stats(pending: usize, in_flight: usize, failed: usize) -> QueueStats {
    QueueStats {
        pending,
        in_flight,
        failed,
        last_error: None,
    }
}

#[test]
fn test_text_online_empty() {
    let out = format_text(Connectivity::Online, &stats(0, 0, 0));
    assert_eq!(out, "Online\n0 items pending sync\n");
}

#[test]
fn test_text_offline_shows_banner() {
    let out = format_text(Connectivity::Offline, &stats(2, 1, 0));
    assert!(out.starts_with("Offline\n3 items pending sync\n"));
    assert!(out.contains("pending: 2, in flight: 1, failed: 0"));
    assert!(out.ends_with(&format!("{}\n", OFFLINE_BANNER)));
}

#[test]
fn test_text_shows_last_error() {
    let mut s = stats(0, 0, 1);
    s.last_error = Some((RecordId::new("rec-1"), SyncFailure::permanent("score out of range")));

    let out = format_text(Connectivity::Online, &s);
    assert!(out.contains("1 item pending sync"));
    assert!(out.contains("Last error: rec-1 score out of range (permanent)"));
}

#[test]
fn test_json_shape() {
    let mut s = stats(1, 0, 1);
    s.last_error = Some((RecordId::new("rec-2"), SyncFailure::transient("database busy")));

    let json: serde_json::Value =
        serde_json::from_str(&format_json(Connectivity::Offline, &s).unwrap()).unwrap();

    assert_eq!(json["online"], false);
    assert_eq!(json["pending"], 1);
    assert_eq!(json["in_flight"], 0);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["last_error"]["id"], "rec-2");
    assert_eq!(json["last_error"]["kind"], "transient");
    assert_eq!(json["last_error"]["reason"], "database busy");
}

#[test]
fn test_json_omits_missing_last_error() {
    let json = format_json(Connectivity::Online, &stats(0, 0, 0)).unwrap();
    assert!(!json.contains("last_error"));
}
