// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the remote store transport.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use yare::parameterized;

enum Reply {
    Send(ServerMessage),
    Raw(&'static str),
    Hangup,
}

type Received = Arc<Mutex<Vec<ClientMessage>>>;

/// Minimal remote store: answers each client frame with the handler's replies.
async fn spawn_server<F>(handler: F) -> (String, Received)
where
    F: Fn(&ClientMessage) -> Vec<Reply> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);
    let log = Arc::clone(&received);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = Arc::clone(&handler);
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                let (mut sink, mut stream) = ws.split();
                while let Some(Ok(Message::Text(text))) = stream.next().await {
                    let msg = ClientMessage::from_json(&text).unwrap();
                    let replies = handler(&msg);
                    log.lock().unwrap().push(msg);
                    for reply in replies {
                        let frame = match reply {
                            Reply::Send(m) => m.to_json().unwrap(),
                            Reply::Raw(s) => s.to_string(),
                            Reply::Hangup => return,
                        };
                        sink.send(Message::Text(frame.into())).await.unwrap();
                    }
                }
            });
        }
    });

    (url, received)
}

fn written_id(msg: &ClientMessage) -> RecordId {
    match msg {
        ClientMessage::Write { record } => record.id.clone(),
        ClientMessage::Ping { .. } => RecordId::new("ping"),
    }
}

fn record(id: &str) -> QueuedRecord {
    QueuedRecord::new(
        RecordId::new(id),
        RecordKind::Assessment,
        Utc.timestamp_millis_opt(1_704_888_000_000).unwrap(),
        json!({"score": 87}),
    )
}

#[tokio::test]
async fn test_ack_returns_record_identity() {
    let (url, received) = spawn_server(|msg| vec![Reply::Send(ServerMessage::ack(written_id(msg)))]).await;
    let mut remote = WebSocketRemote::new(url);
    assert!(!remote.is_connected());

    let ack = remote.send(record("rec-1")).await.unwrap();

    assert_eq!(ack, Ack { id: RecordId::new("rec-1"), kind: RecordKind::Assessment });
    assert!(remote.is_connected());
    assert_eq!(*received.lock().unwrap(), vec![ClientMessage::write(record("rec-1"))]);
}

#[tokio::test]
async fn test_connection_is_reused_across_sends() {
    let (url, received) = spawn_server(|msg| vec![Reply::Send(ServerMessage::ack(written_id(msg)))]).await;
    let mut remote = WebSocketRemote::new(url);

    for id in ["rec-1", "rec-2", "rec-3"] {
        remote.send(record(id)).await.unwrap();
        assert!(remote.is_connected());
    }

    assert_eq!(received.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_rejected_is_permanent() {
    let (url, _) = spawn_server(|msg| {
        vec![Reply::Send(ServerMessage::rejected(written_id(msg), "score out of range"))]
    })
    .await;
    let mut remote = WebSocketRemote::new(url);

    let err = remote.send(record("rec-1")).await.unwrap_err();
    assert_eq!(err, RemoteError::Rejected("score out of range".to_string()));
    assert_eq!(err.class(), FailureClass::Permanent);
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (url, _) = spawn_server(|_| vec![Reply::Send(ServerMessage::error("database busy"))]).await;
    let mut remote = WebSocketRemote::new(url);

    let err = remote.send(record("rec-1")).await.unwrap_err();
    assert_eq!(err, RemoteError::Transient("database busy".to_string()));
    assert_eq!(err.class(), FailureClass::Transient);
}

#[tokio::test]
async fn test_unrelated_replies_are_skipped() {
    let (url, _) = spawn_server(|msg| {
        vec![
            Reply::Send(ServerMessage::pong(7)),
            Reply::Send(ServerMessage::ack(RecordId::new("rec-other"))),
            Reply::Send(ServerMessage::ack(written_id(msg))),
        ]
    })
    .await;
    let mut remote = WebSocketRemote::new(url);

    let ack = remote.send(record("rec-1")).await.unwrap();
    assert_eq!(ack.id, RecordId::new("rec-1"));
}

#[tokio::test]
async fn test_garbage_reply_is_protocol_error() {
    let (url, _) = spawn_server(|_| vec![Reply::Raw("{not json")]).await;
    let mut remote = WebSocketRemote::new(url);

    let err = remote.send(record("rec-1")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Protocol(_)));
    assert_eq!(err.class(), FailureClass::Transient);
}

#[tokio::test]
async fn test_hangup_is_connection_lost_then_reconnects() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let (url, received) = spawn_server(move |msg| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            vec![Reply::Hangup]
        } else {
            vec![Reply::Send(ServerMessage::ack(written_id(msg)))]
        }
    })
    .await;
    let mut remote = WebSocketRemote::new(url);

    let err = remote.send(record("rec-1")).await.unwrap_err();
    assert_eq!(err, RemoteError::ConnectionLost);
    assert!(!remote.is_connected());

    // Same record again: the remote treats the id as the idempotency key.
    let ack = remote.send(record("rec-1")).await.unwrap();
    assert_eq!(ack.id, RecordId::new("rec-1"));
    assert_eq!(received.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let mut remote = WebSocketRemote::new(url);
    let err = remote.send(record("rec-1")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Unreachable(_)));
    assert_eq!(err.class(), FailureClass::Connectivity);
}

#[parameterized(
    unreachable = { RemoteError::Unreachable("refused".into()), FailureClass::Connectivity, None },
    lost = { RemoteError::ConnectionLost, FailureClass::Connectivity, None },
    timeout = { RemoteError::Timeout, FailureClass::Connectivity, None },
    transient = { RemoteError::Transient("busy".into()), FailureClass::Transient, Some(FailureKind::Transient) },
    protocol = { RemoteError::Protocol("bad frame".into()), FailureClass::Transient, Some(FailureKind::Transient) },
    rejected = { RemoteError::Rejected("invalid".into()), FailureClass::Permanent, Some(FailureKind::Permanent) },
)]
fn test_error_classification(err: RemoteError, class: FailureClass, kind: Option<FailureKind>) {
    assert_eq!(err.class(), class);
    assert_eq!(err.failure_kind(), kind);
}
