// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::RemoteError;

/// Errors surfaced by the stride CLI and sync engine.
///
/// Messages carry a hint where there is an obvious next step.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] stride_core::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("you're offline\n  hint: data is saved locally and will sync when the connection is restored")]
    Offline,

    #[error("sync aborted: {0}\n  hint: records left in flight are resent on the next sync")]
    SyncAborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
