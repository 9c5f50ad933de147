// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued record types.
//!
//! A [`QueuedRecord`] is a locally created unit of data (a finished
//! assessment, a recorded video, an analysis result) waiting to reach the
//! remote store. Its identity, kind, timestamp and payload never change once
//! queued; only the sync bookkeeping moves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Identifier of a queued record, unique for the lifetime of the queue.
///
/// Sent to the remote store as the idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

/// What a record holds. Each kind maps to its own remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum RecordKind {
    /// A completed fitness assessment.
    Assessment,
    /// A captured workout video.
    Video,
    /// Output of motion analysis for a video.
    AnalysisResult,
}

impl RecordKind {
    /// All known kinds, in display order.
    pub const ALL: [RecordKind; 3] =
        [RecordKind::Assessment, RecordKind::Video, RecordKind::AnalysisResult];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Assessment => "assessment",
            RecordKind::Video => "video",
            RecordKind::AnalysisResult => "analysis-result",
        }
    }

    /// Remote collection that records of this kind are written to.
    pub fn endpoint(&self) -> &'static str {
        match self {
            RecordKind::Assessment => "assessments",
            RecordKind::Video => "videos",
            RecordKind::AnalysisResult => "analysis-results",
        }
    }

    /// Kind whose records must reach the remote before this one's.
    pub fn depends_on(&self) -> Option<RecordKind> {
        match self {
            RecordKind::AnalysisResult => Some(RecordKind::Video),
            RecordKind::Assessment | RecordKind::Video => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "assessment" => Ok(RecordKind::Assessment),
            "video" => Ok(RecordKind::Video),
            "analysis-result" | "analysis_result" | "analysis" => Ok(RecordKind::AnalysisResult),
            _ => Err(Error::InvalidKind(s.to_string())),
        }
    }
}

/// Delivery state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    /// Waiting for a sync cycle.
    Pending,
    /// Handed to the remote store; outcome not yet known.
    InFlight,
    /// Acknowledged by the remote store.
    Synced,
    /// Last attempt failed; see `last_error`.
    Failed,
}

impl SyncState {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::InFlight => "in-flight",
            SyncState::Synced => "synced",
            SyncState::Failed => "failed",
        }
    }

    /// Check if a transition from this state to target is allowed.
    ///
    /// Forward edges only, except `failed -> pending` for an explicit retry.
    pub fn can_transition_to(&self, target: SyncState) -> bool {
        matches!(
            (self, target),
            (SyncState::Pending, SyncState::InFlight)
                | (SyncState::InFlight, SyncState::Synced)
                | (SyncState::InFlight, SyncState::Failed)
                | (SyncState::Failed, SyncState::Pending)
        )
    }

    /// Returns true once the record has left the active set.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncState::Synced)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a failure is worth retrying without the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network hiccup or server-side trouble; retried with backoff.
    Transient,
    /// The remote store rejected the payload; needs user action.
    Permanent,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// Reason the last sync attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl SyncFailure {
    pub fn transient(reason: impl Into<String>) -> Self {
        SyncFailure { kind: FailureKind::Transient, reason: reason.into() }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        SyncFailure { kind: FailureKind::Permanent, reason: reason.into() }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reason, self.kind)
    }
}

/// A locally created record awaiting transmission to the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedRecord {
    pub id: RecordId,
    pub kind: RecordKind,
    pub created_at: DateTime<Utc>,
    /// Kind-specific data. Never edited in place; a change is a new record.
    pub payload: serde_json::Value,
    pub sync_state: SyncState,
    /// Number of failed delivery attempts.
    #[serde(default)]
    pub attempt_count: u32,
    /// Present only while `sync_state` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<SyncFailure>,
}

impl QueuedRecord {
    /// Creates a fresh pending record.
    pub fn new(
        id: RecordId,
        kind: RecordKind,
        created_at: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        QueuedRecord {
            id,
            kind,
            created_at,
            payload,
            sync_state: SyncState::Pending,
            attempt_count: 0,
            last_error: None,
        }
    }

    /// Returns a copy moved to `target`, or an error if the edge is not allowed.
    ///
    /// Entering `failed` needs a reason and bumps `attempt_count`; leaving it
    /// clears `last_error`.
    pub fn transitioned(&self, target: SyncState, failure: Option<SyncFailure>) -> Result<Self> {
        if !self.sync_state.can_transition_to(target) {
            return Err(Error::InvalidTransition {
                id: self.id.to_string(),
                from: self.sync_state.to_string(),
                to: target.to_string(),
            });
        }

        let mut next = self.clone();
        next.sync_state = target;
        if target == SyncState::Failed {
            next.attempt_count = next.attempt_count.saturating_add(1);
            next.last_error = failure;
        } else {
            next.last_error = None;
        }
        Ok(next)
    }

    /// True if the last failure was transient and the attempt budget allows another try.
    pub fn is_auto_retryable(&self, max_attempts: u32) -> bool {
        self.sync_state == SyncState::Failed
            && self.attempt_count < max_attempts
            && self.last_error.as_ref().is_some_and(|e| e.kind == FailureKind::Transient)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
