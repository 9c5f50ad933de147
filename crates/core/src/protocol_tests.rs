// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::record::{RecordKind, SyncState};
use chrono::TimeZone;
use chrono::Utc;
use serde_json::json;
use yare::parameterized;

fn test_record() -> QueuedRecord {
    QueuedRecord::new(
        RecordId::new("rec-00aa11bb22cc33dd"),
        RecordKind::AnalysisResult,
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap(),
        json!({"form_score": 0.92}),
    )
}

#[test]
fn write_message_wire_format() {
    let msg = ClientMessage::write(test_record());
    let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

    assert_eq!(value["type"], "write");
    assert_eq!(value["record"]["id"], "rec-00aa11bb22cc33dd");
    assert_eq!(value["record"]["kind"], "analysis-result");
    assert_eq!(value["record"]["payload"]["form_score"], 0.92);
}

#[test]
fn write_message_parses_back() {
    let msg = ClientMessage::write(test_record());
    let parsed = ClientMessage::from_json(&msg.to_json().unwrap()).unwrap();
    assert!(matches!(
        parsed,
        ClientMessage::Write { ref record }
            if record.id == test_record().id && record.sync_state == SyncState::Pending
    ));
}

#[test]
fn ping_message_wire_format() {
    assert_eq!(ClientMessage::ping(7).to_json().unwrap(), r#"{"type":"ping","id":7}"#);
}

#[parameterized(
    ack = { r#"{"type":"ack","id":"rec-1"}"#, ServerMessage::ack(RecordId::new("rec-1")) },
    rejected = { r#"{"type":"rejected","id":"rec-1","reason":"score out of range"}"#, ServerMessage::rejected(RecordId::new("rec-1"), "score out of range") },
    error = { r#"{"type":"error","message":"busy"}"#, ServerMessage::error("busy") },
    pong = { r#"{"type":"pong","id":3}"#, ServerMessage::pong(3) },
)]
fn server_message_parses(json: &str, expected: ServerMessage) {
    assert_eq!(ServerMessage::from_json(json).unwrap(), expected);
}

#[test]
fn server_message_rejects_unknown_type() {
    assert!(ServerMessage::from_json(r#"{"type":"snapshot"}"#).is_err());
}

#[test]
fn record_id_only_for_record_replies() {
    let id = RecordId::new("rec-1");
    assert_eq!(ServerMessage::ack(id.clone()).record_id(), Some(&id));
    assert_eq!(ServerMessage::rejected(id.clone(), "no").record_id(), Some(&id));
    assert_eq!(ServerMessage::error("busy").record_id(), None);
    assert_eq!(ServerMessage::pong(1).record_id(), None);
}
