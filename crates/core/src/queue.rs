// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, ordered queue of records awaiting sync.
//!
//! The queue is a journal of JSONL entries. Every mutation appends (and
//! fsyncs) its entry before the in-memory view changes, so a failed write
//! leaves the queue exactly as it was. On open the journal is replayed: the
//! last `put` per record wins and a `remove` tombstone retires the ID.
//!
//! ```text
//! {"op":"put","seq":0,"record":{...,"sync_state":"pending"}}
//! {"op":"put","seq":0,"record":{...,"sync_state":"in-flight"}}
//! {"op":"remove","seq":0,"id":"rec-..."}
//! ```
//!
//! The `seq` field is the record's insertion sequence number and is what
//! restores ordering after a restart.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::clock::{ClockSource, SystemClock};
use crate::error::{Error, Result};
use crate::id::generate_unique_id;
use crate::jsonl;
use crate::record::{QueuedRecord, RecordId, RecordKind, SyncFailure, SyncState};

/// Minimum number of dead journal lines before compaction kicks in.
const COMPACT_MIN_GARBAGE: usize = 64;

/// Tombstones kept through compaction; older ones are forgotten.
const MAX_RETIRED: usize = 4096;

/// A single line of the queue journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalEntry {
    /// Insert or replace the record stored under `seq`.
    Put { seq: u64, record: QueuedRecord },
    /// The record was acknowledged remotely and left the active set.
    Remove { seq: u64, id: RecordId },
}

/// Counts shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub in_flight: usize,
    pub failed: usize,
    /// Most recent failure still unresolved.
    pub last_error: Option<(RecordId, SyncFailure)>,
}

impl QueueStats {
    /// Records not yet acknowledged by the remote store.
    pub fn total(&self) -> usize {
        self.pending + self.in_flight + self.failed
    }
}

/// Notification delivered to queue listeners after a mutation commits.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// A producer added a record.
    Enqueued { id: RecordId, kind: RecordKind },
    /// Counts after any mutation, including enqueue.
    Changed(QueueStats),
}

type Listener = Arc<dyn Fn(&QueueEvent) + Send + Sync>;

#[derive(Default)]
struct Inner {
    /// Active records keyed by insertion sequence.
    records: BTreeMap<u64, QueuedRecord>,
    /// Active record ID to sequence number.
    index: HashMap<RecordId, u64>,
    /// Synced IDs, kept so they are never issued again.
    retired: BTreeMap<RecordId, u64>,
    last_failure: Option<(RecordId, SyncFailure)>,
    next_seq: u64,
    /// Per-process ID counter.
    counter: u64,
    /// Lines currently in the journal file.
    journal_lines: usize,
    /// Bytes of the journal already applied.
    journal_len: u64,
    /// Records appended by other processes, not yet announced.
    imported: Vec<(RecordId, RecordKind)>,
}

impl Inner {
    fn knows(&self, id: &str) -> bool {
        let id = RecordId::from(id);
        self.index.contains_key(&id) || self.retired.contains_key(&id)
    }

    fn apply(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Put { seq, record } => {
                self.next_seq = self.next_seq.max(seq + 1);
                if self.retired.contains_key(&record.id) {
                    tracing::warn!(id = %record.id, "ignoring put for retired record");
                } else {
                    self.index.insert(record.id.clone(), seq);
                    self.records.insert(seq, record);
                }
            }
            JournalEntry::Remove { seq, id } => {
                self.next_seq = self.next_seq.max(seq + 1);
                if let Some(seq) = self.index.remove(&id) {
                    self.records.remove(&seq);
                }
                self.retired.insert(id, seq);
            }
        }
    }

    /// Apply entries other processes appended since the last read.
    fn catch_up(&mut self, path: &Path) -> Result<()> {
        let len = jsonl::file_len(path)?;
        if len == self.journal_len {
            return Ok(());
        }
        if len < self.journal_len {
            return Err(Error::CorruptedJournal {
                line: self.journal_lines,
                reason: "journal shrank while the queue was open".to_string(),
            });
        }

        let (entries, end) = jsonl::read_from::<JournalEntry>(path, self.journal_len)?;
        for entry in entries {
            if let JournalEntry::Put { record, .. } = &entry {
                if !self.knows(record.id.as_str()) {
                    self.imported.push((record.id.clone(), record.kind));
                }
            }
            self.apply(entry);
            self.journal_lines += 1;
        }
        self.journal_len = end;
        Ok(())
    }

    /// Forget all but the newest `limit` tombstones.
    fn prune_retired(&mut self, limit: usize) {
        if self.retired.len() <= limit {
            return;
        }
        let mut seqs: Vec<u64> = self.retired.values().copied().collect();
        seqs.sort_unstable();
        let cutoff = seqs[seqs.len() - limit];
        self.retired.retain(|_, seq| *seq >= cutoff);
    }

    fn seq_of(&self, id: &RecordId) -> Result<u64> {
        self.index.get(id).copied().ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }

    fn get(&self, id: &RecordId) -> Option<&QueuedRecord> {
        self.index.get(id).and_then(|seq| self.records.get(seq))
    }

    fn refresh_last_failure(&mut self) {
        let still_failed = self
            .last_failure
            .as_ref()
            .and_then(|(id, _)| self.get(id))
            .is_some_and(|r| r.sync_state == SyncState::Failed);
        if still_failed {
            return;
        }
        self.last_failure = self
            .records
            .values()
            .rev()
            .find(|r| r.sync_state == SyncState::Failed)
            .and_then(|r| r.last_error.clone().map(|e| (r.id.clone(), e)));
    }

    fn stats(&self) -> QueueStats {
        let mut stats = QueueStats { last_error: self.last_failure.clone(), ..Default::default() };
        for record in self.records.values() {
            match record.sync_state {
                SyncState::Pending => stats.pending += 1,
                SyncState::InFlight => stats.in_flight += 1,
                SyncState::Failed => stats.failed += 1,
                SyncState::Synced => {}
            }
        }
        stats
    }

    fn garbage(&self) -> usize {
        self.journal_lines.saturating_sub(self.records.len() + self.retired.len())
    }

    fn needs_compaction(&self) -> bool {
        self.garbage() > COMPACT_MIN_GARBAGE.max(self.records.len() * 2)
    }

    fn compacted_entries(&self) -> Vec<JournalEntry> {
        let mut tombstones: Vec<_> = self.retired.iter().collect();
        tombstones.sort_by_key(|(_, seq)| **seq);

        tombstones
            .into_iter()
            .map(|(id, seq)| JournalEntry::Remove { seq: *seq, id: id.clone() })
            .chain(
                self.records
                    .iter()
                    .map(|(seq, record)| JournalEntry::Put { seq: *seq, record: record.clone() }),
            )
            .collect()
    }
}

/// Durable, ordered store of records awaiting sync.
///
/// All access goes through the methods below; each one holds an internal
/// lock for its whole duration, so mutations never interleave. Only one
/// process may own a queue file at a time. Other processes add records with
/// [`MutationQueue::enqueue_at`] and the owner picks them up on
/// [`MutationQueue::refresh`]. Every journal write, local or not, holds a
/// short-lived writer lock.
pub struct MutationQueue {
    path: PathBuf,
    clock: Arc<dyn ClockSource>,
    node_id: u32,
    inner: Mutex<Inner>,
    listeners: Mutex<Vec<Listener>>,
    /// Held for the lifetime of the queue.
    _lock: File,
}

impl MutationQueue {
    /// Open (or create) the queue journal at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    /// Open with a custom clock for record timestamps.
    pub fn with_clock(path: &Path, clock: Arc<dyn ClockSource>) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock = acquire_lock(&lock_path(path))?;
        let writer = lock_writer(path)?;

        let mut inner = replay(path)?;
        if inner.needs_compaction() || !jsonl::ends_cleanly(path)? {
            inner.prune_retired(MAX_RETIRED);
            let compacted = inner.compacted_entries();
            jsonl::write_all(path, &compacted)?;
            inner.journal_lines = compacted.len();
        }
        inner.journal_len = jsonl::file_len(path)?;
        drop(writer);

        tracing::debug!(
            path = %path.display(),
            active = inner.records.len(),
            retired = inner.retired.len(),
            "opened mutation queue"
        );

        Ok(MutationQueue {
            path: path.to_path_buf(),
            clock,
            node_id: std::process::id(),
            inner: Mutex::new(inner),
            listeners: Mutex::new(Vec::new()),
            _lock: lock,
        })
    }

    /// Read a journal without taking ownership of it.
    ///
    /// Used for display while another process owns the queue. The result may
    /// be stale by the time it is shown.
    pub fn load_snapshot(path: &Path) -> Result<(Vec<QueuedRecord>, QueueStats)> {
        let inner = replay(path)?;
        Ok((inner.records.values().cloned().collect(), inner.stats()))
    }

    /// Add a record to the journal at `path` without owning the queue.
    ///
    /// Works whether or not another process has the queue open; the owner
    /// sees the record after its next [`MutationQueue::refresh`].
    pub fn enqueue_at(path: &Path, kind: RecordKind, payload: serde_json::Value) -> Result<RecordId> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let _writer = lock_writer(path)?;
        let inner = replay(path)?;
        let created_at = SystemClock.now();
        let id = generate_unique_id(kind, &created_at, std::process::id(), 0, |c| inner.knows(c));
        let record = QueuedRecord::new(RecordId::new(id), kind, created_at, payload);
        let id = record.id.clone();
        jsonl::append(path, &JournalEntry::Put { seq: inner.next_seq, record })?;

        tracing::debug!(%id, %kind, "appended record to shared journal");
        Ok(id)
    }

    /// Pick up records other processes appended to the journal.
    ///
    /// Each one is announced to listeners as `Enqueued`. Returns how many
    /// were found.
    pub fn refresh(&self) -> Result<usize> {
        let (imported, stats) = {
            let mut inner = self.lock();
            inner.catch_up(&self.path)?;
            if inner.imported.is_empty() {
                return Ok(0);
            }
            (std::mem::take(&mut inner.imported), inner.stats())
        };

        for (id, kind) in &imported {
            tracing::debug!(%id, %kind, "picked up record from another process");
            self.notify(&QueueEvent::Enqueued { id: id.clone(), kind: *kind });
        }
        self.notify(&QueueEvent::Changed(stats));
        Ok(imported.len())
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register a listener called after every committed mutation.
    ///
    /// Listeners run on the mutating thread, outside the queue lock.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&QueueEvent) + Send + Sync + 'static,
    {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).push(Arc::new(listener));
    }

    /// Add a record. Always succeeds unless the durable write fails.
    pub fn enqueue(&self, kind: RecordKind, payload: serde_json::Value) -> Result<RecordId> {
        let (id, stats) = {
            let mut inner = self.lock();
            let _writer = self.begin_write(&mut inner)?;
            let created_at = self.clock.now();
            let id = generate_unique_id(kind, &created_at, self.node_id, inner.counter, |c| {
                inner.knows(c)
            });
            let seq = inner.next_seq;
            let record = QueuedRecord::new(RecordId::new(id), kind, created_at, payload);

            self.write_entry(&mut inner, &JournalEntry::Put { seq, record: record.clone() })?;

            let id = record.id.clone();
            inner.counter += 1;
            inner.next_seq = seq + 1;
            inner.index.insert(id.clone(), seq);
            inner.records.insert(seq, record);
            self.maybe_compact(&mut inner);
            (id, inner.stats())
        };

        tracing::debug!(%id, %kind, "enqueued record");
        self.notify(&QueueEvent::Enqueued { id: id.clone(), kind });
        self.notify(&QueueEvent::Changed(stats));
        Ok(id)
    }

    /// Move a pending record to in-flight.
    ///
    /// Returns `Ok(false)` without touching anything if the record is not
    /// pending, which guards against dispatching it twice.
    pub fn mark_in_flight(&self, id: &RecordId) -> Result<bool> {
        let stats = {
            let mut inner = self.lock();
            let _writer = self.begin_write(&mut inner)?;
            let record = inner.get(id).ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
            if record.sync_state != SyncState::Pending {
                tracing::warn!(%id, state = %record.sync_state, "not pending, refusing to dispatch");
                return Ok(false);
            }
            let next = record.transitioned(SyncState::InFlight, None)?;
            self.commit_put(&mut inner, next)?;
            inner.stats()
        };

        self.notify(&QueueEvent::Changed(stats));
        Ok(true)
    }

    /// Confirm remote acknowledgment; the record leaves the active set.
    pub fn mark_synced(&self, id: &RecordId) -> Result<()> {
        let stats = {
            let mut inner = self.lock();
            let _writer = self.begin_write(&mut inner)?;
            let record = inner.get(id).ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
            record.transitioned(SyncState::Synced, None)?;
            let seq = inner.seq_of(id)?;

            self.write_entry(&mut inner, &JournalEntry::Remove { seq, id: id.clone() })?;

            inner.index.remove(id);
            inner.records.remove(&seq);
            inner.retired.insert(id.clone(), seq);
            self.maybe_compact(&mut inner);
            inner.stats()
        };

        tracing::debug!(%id, "record synced");
        self.notify(&QueueEvent::Changed(stats));
        Ok(())
    }

    /// Record a failed delivery attempt for an in-flight record.
    pub fn mark_failed(&self, id: &RecordId, failure: SyncFailure) -> Result<QueuedRecord> {
        let (record, stats) = {
            let mut inner = self.lock();
            let _writer = self.begin_write(&mut inner)?;
            let record = inner.get(id).ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
            let next = record.transitioned(SyncState::Failed, Some(failure.clone()))?;
            self.commit_put(&mut inner, next.clone())?;
            inner.last_failure = Some((id.clone(), failure));
            (next, inner.stats())
        };

        tracing::info!(
            %id,
            attempts = record.attempt_count,
            "record failed: {}",
            record.last_error.as_ref().map(|e| e.to_string()).unwrap_or_default()
        );
        self.notify(&QueueEvent::Changed(stats));
        Ok(record)
    }

    /// Count a send of an in-flight record that got no answer.
    ///
    /// The record stays in flight, since the remote may have stored it, but
    /// the attempt uses up part of its budget.
    pub fn mark_unconfirmed(&self, id: &RecordId) -> Result<QueuedRecord> {
        let mut inner = self.lock();
        let _writer = self.begin_write(&mut inner)?;
        let record = inner.get(id).ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        if record.sync_state != SyncState::InFlight {
            return Err(Error::InvalidTransition {
                id: id.to_string(),
                from: record.sync_state.to_string(),
                to: SyncState::InFlight.to_string(),
            });
        }
        let mut next = record.clone();
        next.attempt_count = next.attempt_count.saturating_add(1);
        self.commit_put(&mut inner, next.clone())?;
        Ok(next)
    }

    /// Put a failed record back to pending. The attempt count is kept.
    pub fn retry(&self, id: &RecordId) -> Result<()> {
        let stats = {
            let mut inner = self.lock();
            let _writer = self.begin_write(&mut inner)?;
            let record = inner.get(id).ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
            let next = record.transitioned(SyncState::Pending, None)?;
            self.commit_put(&mut inner, next)?;
            inner.refresh_last_failure();
            inner.stats()
        };

        self.notify(&QueueEvent::Changed(stats));
        Ok(())
    }

    /// Retry every failed record. Returns the IDs moved back to pending.
    pub fn retry_all_failed(&self) -> Result<Vec<RecordId>> {
        let (retried, stats) = {
            let mut inner = self.lock();
            let _writer = self.begin_write(&mut inner)?;
            let failed: Vec<QueuedRecord> = inner
                .records
                .values()
                .filter(|r| r.sync_state == SyncState::Failed)
                .cloned()
                .collect();

            let mut retried = Vec::with_capacity(failed.len());
            for record in failed {
                let next = record.transitioned(SyncState::Pending, None)?;
                self.commit_put(&mut inner, next)?;
                retried.push(record.id);
            }
            inner.refresh_last_failure();
            (retried, inner.stats())
        };

        if !retried.is_empty() {
            self.notify(&QueueEvent::Changed(stats));
        }
        Ok(retried)
    }

    /// Point-in-time copy of every active record, in insertion order.
    ///
    /// Includes pending, in-flight and failed records.
    pub fn snapshot_pending(&self) -> Vec<QueuedRecord> {
        self.lock().records.values().cloned().collect()
    }

    /// Look up an active record.
    pub fn get(&self, id: &RecordId) -> Option<QueuedRecord> {
        self.lock().get(id).cloned()
    }

    /// Current counts for display.
    pub fn stats(&self) -> QueueStats {
        self.lock().stats()
    }

    /// Number of active records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Check if no records are awaiting sync.
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Persist a replacement for an existing record, then apply it.
    fn commit_put(&self, inner: &mut Inner, record: QueuedRecord) -> Result<()> {
        let seq = inner.seq_of(&record.id)?;
        self.write_entry(inner, &JournalEntry::Put { seq, record: record.clone() })?;
        inner.records.insert(seq, record);
        self.maybe_compact(inner);
        Ok(())
    }

    /// Take the journal writer lock and apply what other processes wrote.
    ///
    /// Journal writes happen only while the returned file is alive.
    fn begin_write(&self, inner: &mut Inner) -> Result<File> {
        let writer = lock_writer(&self.path)?;
        inner.catch_up(&self.path)?;
        Ok(writer)
    }

    fn write_entry(&self, inner: &mut Inner, entry: &JournalEntry) -> Result<()> {
        inner.journal_len = jsonl::append(&self.path, entry)?;
        inner.journal_lines += 1;
        Ok(())
    }

    /// Rewrite the journal once dead lines dominate. Failure is not fatal:
    /// the old journal is still complete.
    fn maybe_compact(&self, inner: &mut Inner) {
        if !inner.needs_compaction() {
            return;
        }
        inner.prune_retired(MAX_RETIRED);
        let compacted = inner.compacted_entries();
        match jsonl::write_all(&self.path, &compacted).and_then(|()| jsonl::file_len(&self.path)) {
            Ok(len) => {
                tracing::debug!(lines = compacted.len(), "compacted queue journal");
                inner.journal_lines = compacted.len();
                inner.journal_len = len;
            }
            Err(e) => tracing::warn!("journal compaction failed: {}", e),
        }
    }

    fn notify(&self, event: &QueueEvent) {
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner()).clone();
        for listener in listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for MutationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationQueue").field("path", &self.path).finish_non_exhaustive()
    }
}

fn replay(path: &Path) -> Result<Inner> {
    let entries: Vec<JournalEntry> = jsonl::read_all(path)?;
    let mut inner = Inner { journal_lines: entries.len(), ..Default::default() };
    for entry in entries {
        inner.apply(entry);
    }
    inner.refresh_last_failure();
    Ok(inner)
}

/// Lock file guarding a journal.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

/// Lock file serializing journal writes across processes.
pub fn writer_lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".write.lock");
    path.with_file_name(name)
}

/// Block until this process is the only journal writer.
fn lock_writer(path: &Path) -> Result<File> {
    use fs2::FileExt;

    let file =
        OpenOptions::new().create(true).write(true).truncate(false).open(writer_lock_path(path))?;
    file.lock_exclusive()?;
    Ok(file)
}

fn acquire_lock(lock_path: &Path) -> Result<File> {
    use fs2::FileExt;

    let file = OpenOptions::new().create(true).write(true).truncate(false).open(lock_path)?;
    file.try_lock_exclusive()
        .map_err(|_| Error::QueueLocked(lock_path.display().to_string()))?;
    Ok(file)
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
