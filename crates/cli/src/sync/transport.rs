// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote store abstraction.
//!
//! The coordinator talks to the remote through [`RemoteStore`], which
//! enables:
//! - A real WebSocket remote for production
//! - Scripted mock stores for unit testing

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use stride_core::protocol::{ClientMessage, ServerMessage};
use stride_core::{FailureKind, QueuedRecord, RecordId, RecordKind};

/// Error type for remote store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    /// Could not reach the remote at all.
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    /// The connection dropped before a reply arrived.
    #[error("connection lost")]
    ConnectionLost,

    /// No reply within the write timeout.
    #[error("timed out waiting for acknowledgement")]
    Timeout,

    /// The remote could not handle the write right now.
    #[error("remote error: {0}")]
    Transient(String),

    /// The remote refused the record.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The remote answered with something unintelligible.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// How the coordinator reacts to a [`RemoteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Abort the cycle and leave in-flight records alone.
    Connectivity,
    /// Mark the record failed; it may be retried.
    Transient,
    /// Mark the record failed for good.
    Permanent,
}

impl RemoteError {
    pub fn class(&self) -> FailureClass {
        match self {
            RemoteError::Unreachable(_) | RemoteError::ConnectionLost | RemoteError::Timeout => {
                FailureClass::Connectivity
            }
            RemoteError::Transient(_) | RemoteError::Protocol(_) => FailureClass::Transient,
            RemoteError::Rejected(_) => FailureClass::Permanent,
        }
    }

    /// Failure kind recorded on the record, for non-connectivity errors.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.class() {
            FailureClass::Connectivity => None,
            FailureClass::Transient => Some(FailureKind::Transient),
            FailureClass::Permanent => Some(FailureKind::Permanent),
        }
    }
}

/// Result type for remote store operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Acknowledgement of a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub id: RecordId,
    pub kind: RecordKind,
}

/// Destination for queued records.
///
/// Writes must be idempotent on the record id: the same record may be sent
/// more than once after an interrupted cycle.
pub trait RemoteStore: Send {
    /// Write one record and wait for the remote's verdict.
    fn send(
        &mut self,
        record: QueuedRecord,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Ack>> + Send + '_>>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket remote using tokio-tungstenite.
///
/// Connects on first use and again after the connection is lost.
pub struct WebSocketRemote {
    url: String,
    ws: Option<WebSocketConnection>,
}

struct WebSocketConnection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl WebSocketRemote {
    pub fn new(url: impl Into<String>) -> Self {
        WebSocketRemote {
            url: url.into(),
            ws: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.ws.is_some()
    }

    /// Close the connection, if any.
    pub async fn disconnect(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            let _ = ws.sink.close().await;
        }
    }

    async fn connection(&mut self) -> RemoteResult<&mut WebSocketConnection> {
        if self.ws.is_none() {
            let (ws_stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
                .await
                .map_err(|e| RemoteError::Unreachable(e.to_string()))?;
            let (sink, stream) = ws_stream.split();
            tracing::debug!(url = %self.url, "connected to remote");
            self.ws = Some(WebSocketConnection { sink, stream });
        }
        self.ws.as_mut().ok_or(RemoteError::ConnectionLost)
    }

    async fn write(&mut self, record: QueuedRecord) -> RemoteResult<Ack> {
        let id = record.id.clone();
        let kind = record.kind;
        let json = ClientMessage::write(record)
            .to_json()
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;

        let ws = self.connection().await?;
        if ws.sink.send(Message::Text(json.into())).await.is_err()
            || ws.sink.flush().await.is_err()
        {
            self.ws = None;
            return Err(RemoteError::ConnectionLost);
        }

        loop {
            let ws = self.ws.as_mut().ok_or(RemoteError::ConnectionLost)?;
            let text = match ws.stream.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    self.ws = None;
                    return Err(RemoteError::ConnectionLost);
                }
                // Ping/pong and binary frames
                Some(Ok(_)) => continue,
            };

            let reply = ServerMessage::from_json(&text)
                .map_err(|e| RemoteError::Protocol(e.to_string()))?;
            match reply {
                ServerMessage::Ack { id: acked } if acked == id => return Ok(Ack { id, kind }),
                ServerMessage::Rejected { id: rejected, reason } if rejected == id => {
                    return Err(RemoteError::Rejected(reason));
                }
                ServerMessage::Error { message } => return Err(RemoteError::Transient(message)),
                other => {
                    tracing::debug!(?other, "ignoring unrelated reply");
                }
            }
        }
    }
}

impl RemoteStore for WebSocketRemote {
    fn send(
        &mut self,
        record: QueuedRecord,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Ack>> + Send + '_>> {
        Box::pin(self.write(record))
    }
}

impl std::fmt::Debug for WebSocketRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketRemote")
            .field("url", &self.url)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
