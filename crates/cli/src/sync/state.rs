// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator phase shared with readers.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Phase values for the atomic phase field.
pub const PHASE_IDLE: u8 = 0;
pub const PHASE_SYNCING: u8 = 1;
pub const PHASE_BACKOFF: u8 = 2;

/// What the coordinator is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Syncing,
    /// Waiting before the next cycle. `until_ms` is wall-clock epoch millis.
    Backoff { attempt: u32, until_ms: u64 },
}

impl SyncPhase {
    /// Label for the manual sync control.
    pub fn action_label(&self) -> &'static str {
        match self {
            SyncPhase::Syncing => "Syncing...",
            SyncPhase::Idle | SyncPhase::Backoff { .. } => "Sync Now",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Idle => write!(f, "idle"),
            SyncPhase::Syncing => write!(f, "syncing"),
            SyncPhase::Backoff { attempt, .. } => write!(f, "backoff (attempt {})", attempt),
        }
    }
}

/// Coordinator phase visible to the run loop and to readers.
///
/// Uses atomic fields for lock-free reads from presentation code.
pub struct SharedSyncState {
    phase: AtomicU8,
    attempt: AtomicU32,
    until_ms: AtomicU64,
}

impl SharedSyncState {
    /// Create a new shared state initialized to idle.
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(PHASE_IDLE),
            attempt: AtomicU32::new(0),
            until_ms: AtomicU64::new(0),
        }
    }

    /// Get the current phase.
    pub fn get(&self) -> SyncPhase {
        match self.phase.load(Ordering::Acquire) {
            PHASE_SYNCING => SyncPhase::Syncing,
            PHASE_BACKOFF => SyncPhase::Backoff {
                attempt: self.attempt.load(Ordering::Acquire),
                until_ms: self.until_ms.load(Ordering::Acquire),
            },
            _ => SyncPhase::Idle,
        }
    }

    /// Set the phase.
    pub fn set(&self, phase: SyncPhase) {
        match phase {
            SyncPhase::Idle => self.phase.store(PHASE_IDLE, Ordering::Release),
            SyncPhase::Syncing => self.phase.store(PHASE_SYNCING, Ordering::Release),
            SyncPhase::Backoff { attempt, until_ms } => {
                self.attempt.store(attempt, Ordering::Release);
                self.until_ms.store(until_ms, Ordering::Release);
                self.phase.store(PHASE_BACKOFF, Ordering::Release);
            }
        }
    }

    /// Check if a cycle is running.
    pub fn is_syncing(&self) -> bool {
        self.phase.load(Ordering::Acquire) == PHASE_SYNCING
    }
}

impl Default for SharedSyncState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
