// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for stride-core operations.

use thiserror::Error;

/// All possible errors that can occur in stride-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("invalid sync transition for {id}: cannot go from {from} to {to}")]
    InvalidTransition { id: String, from: String, to: String },

    #[error("invalid record kind: '{0}'\n  hint: valid kinds are: assessment, video, analysis-result")]
    InvalidKind(String),

    #[error("queue is locked by another process: {0}\n  hint: stop the running 'stride run' before modifying the queue")]
    QueueLocked(String),

    #[error("corrupted journal at line {line}: {reason}")]
    CorruptedJournal { line: usize, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for stride-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
