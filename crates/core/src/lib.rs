// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! stride-core: Shared library for the stride offline sync core
//!
//! This crate provides the record model, the durable mutation queue, the
//! remote-store wire protocol and the clock/ID primitives used by the
//! stride sync coordinator and CLI.

pub mod clock;
pub mod error;
pub mod id;
pub mod jsonl;
pub mod protocol;
pub mod queue;
pub mod record;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use protocol::{ClientMessage, ServerMessage};
pub use queue::{JournalEntry, MutationQueue, QueueEvent, QueueStats};
pub use record::{FailureKind, QueuedRecord, RecordId, RecordKind, SyncFailure, SyncState};
