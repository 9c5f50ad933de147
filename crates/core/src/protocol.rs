// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages between the client and the remote store.
//!
//! The protocol is simple:
//! - Client sends one `write` per queued record
//! - Server answers each write with `ack`, `rejected` or `error`
//!
//! The record ID is the idempotency key: a server seeing a `write` for an ID
//! it already stored must answer `ack` without storing it again. This is what
//! makes resending pending-unknown records safe.

use serde::{Deserialize, Serialize};

use crate::record::{QueuedRecord, RecordId};

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Store a record in the collection for its kind.
    Write {
        /// The full record, including its client-assigned ID.
        record: QueuedRecord,
    },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The record is durably stored (or was already).
    Ack { id: RecordId },

    /// The record is invalid and will never be accepted as-is.
    Rejected { id: RecordId, reason: String },

    /// The server could not process the request right now.
    Error {
        /// Human-readable error description.
        message: String,
    },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },
}

impl ClientMessage {
    /// Creates a Write message.
    pub fn write(record: QueuedRecord) -> Self {
        ClientMessage::Write { record }
    }

    /// Creates a Ping message.
    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Creates an Ack message.
    pub fn ack(id: RecordId) -> Self {
        ServerMessage::Ack { id }
    }

    /// Creates a Rejected message.
    pub fn rejected(id: RecordId, reason: impl Into<String>) -> Self {
        ServerMessage::Rejected { id, reason: reason.into() }
    }

    /// Creates an Error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error { message: message.into() }
    }

    /// Creates a Pong message.
    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    /// The record this message answers, if any.
    pub fn record_id(&self) -> Option<&RecordId> {
        match self {
            ServerMessage::Ack { id } | ServerMessage::Rejected { id, .. } => Some(id),
            ServerMessage::Error { .. } | ServerMessage::Pong { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
