// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync coordinator.
//!
//! Drains the mutation queue into the remote store whenever the device is
//! online. A cycle walks the queue in insertion order:
//!
//! - pending records are marked in-flight and sent
//! - in-flight records left by an interrupted cycle are resent as-is
//! - failed records are retried only while their failure is transient and
//!   under the attempt cap
//!
//! Losing connectivity mid-cycle aborts the remaining batch. Records already
//! in flight stay in flight and are resent next time, so delivery is
//! at-least-once and relies on the remote treating the record id as an
//! idempotency key. A send the remote never answers while the device stays
//! online (a timeout or a dropped socket) also aborts, but counts against the
//! record's attempt budget; once the budget is spent the record is marked
//! failed so it cannot hold up the rest of the queue.
//!
//! Ordering: a transient failure defers later records of the same kind, and
//! of any kind that depends on it (analysis results wait for their video).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use stride_core::{
    MutationQueue, QueueEvent, QueuedRecord, RecordId, RecordKind, SyncFailure, SyncState,
};

use super::backoff::Backoff;
use super::connectivity::Connectivity;
use super::state::{SharedSyncState, SyncPhase};
use super::transport::{Ack, FailureClass, RemoteError, RemoteResult, RemoteStore};

/// Coordinator tuning.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Failures after which a transient error is no longer retried automatically.
    pub max_attempts: u32,
    /// Records sent per cycle (0 = unbounded).
    pub batch_size: usize,
    /// Max time to wait for one record's acknowledgement.
    pub write_timeout: Duration,
    /// First backoff delay.
    pub initial_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            batch_size: 0,
            write_timeout: Duration::from_secs(10),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Why a cycle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Manual,
    Enqueued,
    Reconnected,
    BackoffElapsed,
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every eligible record was attempted.
    Completed,
    /// Connectivity was lost or local state could not be written.
    Aborted { reason: String },
    /// Another cycle holds the remote.
    AlreadySyncing,
    /// Nothing attempted because the device is offline.
    Offline,
}

/// What a cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Acknowledged and removed from the queue.
    pub synced: Vec<RecordId>,
    /// Marked failed during this cycle.
    pub failed: Vec<(RecordId, SyncFailure)>,
    /// In-flight leftovers sent again.
    pub resent: usize,
    /// Failed records moved back to pending for another try.
    pub retried: usize,
    /// Held back behind an earlier failure of the same kind.
    pub deferred: usize,
    /// Failed records left alone (permanent or at the attempt cap).
    pub skipped: usize,
    /// Failures from this cycle that will be retried automatically.
    pub retryable: usize,
    /// Sends the remote never answered, counted against the record.
    pub unconfirmed: usize,
}

impl CycleReport {
    pub fn new(outcome: CycleOutcome) -> Self {
        CycleReport {
            outcome,
            synced: Vec::new(),
            failed: Vec::new(),
            resent: 0,
            retried: 0,
            deferred: 0,
            skipped: 0,
            retryable: 0,
            unconfirmed: 0,
        }
    }

    /// True if the run loop should wait before the next cycle.
    pub fn needs_backoff(&self) -> bool {
        match self.outcome {
            CycleOutcome::Aborted { .. } => true,
            CycleOutcome::Completed => self.retryable > 0,
            CycleOutcome::AlreadySyncing | CycleOutcome::Offline => false,
        }
    }
}

/// Clonable control surface for a running coordinator.
#[derive(Clone)]
pub struct SyncHandle {
    triggers: mpsc::Sender<Trigger>,
    state: Arc<SharedSyncState>,
    shutdown: CancellationToken,
}

impl SyncHandle {
    /// Request a cycle now, overriding any backoff.
    ///
    /// Coalesced with a request that is already waiting.
    pub fn sync_now(&self) {
        if self.triggers.try_send(Trigger::Manual).is_err() {
            tracing::debug!("sync already requested");
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.get()
    }

    /// Stop the run loop. A record being sent stays in flight.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for SyncHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHandle")
            .field("phase", &self.phase())
            .finish()
    }
}

/// Moves queued records to the remote store.
pub struct SyncCoordinator<R> {
    queue: Arc<MutationQueue>,
    /// Held for the whole of a cycle; doubles as the single-cycle guard.
    remote: tokio::sync::Mutex<R>,
    connectivity: watch::Receiver<Connectivity>,
    config: SyncConfig,
    state: Arc<SharedSyncState>,
    trigger_tx: mpsc::Sender<Trigger>,
    trigger_rx: Mutex<Option<mpsc::Receiver<Trigger>>>,
    shutdown: CancellationToken,
}

impl<R: RemoteStore> SyncCoordinator<R> {
    /// Create a coordinator and a handle to control it.
    ///
    /// Registers a queue listener so new records trigger a cycle while online.
    pub fn new(
        queue: Arc<MutationQueue>,
        remote: R,
        connectivity: watch::Receiver<Connectivity>,
        config: SyncConfig,
    ) -> (Self, SyncHandle) {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);

        let tx = trigger_tx.clone();
        let online = connectivity.clone();
        queue.subscribe(move |event| {
            if let QueueEvent::Enqueued { .. } = event {
                if online.borrow().is_online() {
                    let _ = tx.try_send(Trigger::Enqueued);
                }
            }
        });

        let coordinator = SyncCoordinator {
            queue,
            remote: tokio::sync::Mutex::new(remote),
            connectivity,
            config,
            state: Arc::new(SharedSyncState::new()),
            trigger_tx,
            trigger_rx: Mutex::new(Some(trigger_rx)),
            shutdown: CancellationToken::new(),
        };
        let handle = coordinator.handle();
        (coordinator, handle)
    }

    /// Another handle to this coordinator.
    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            triggers: self.trigger_tx.clone(),
            state: Arc::clone(&self.state),
            shutdown: self.shutdown.clone(),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.get()
    }

    fn is_online(&self) -> bool {
        self.connectivity.borrow().is_online()
    }

    /// Run one cycle.
    ///
    /// Returns `AlreadySyncing` without doing anything if a cycle is running.
    pub async fn run_cycle(&self) -> CycleReport {
        let Ok(mut remote) = self.remote.try_lock() else {
            tracing::debug!("sync cycle already running");
            return CycleReport::new(CycleOutcome::AlreadySyncing);
        };
        if !self.is_online() {
            tracing::debug!("offline, not syncing");
            return CycleReport::new(CycleOutcome::Offline);
        }

        self.state.set(SyncPhase::Syncing);
        let report = self.drain(&mut *remote).await;
        self.state.set(SyncPhase::Idle);

        match &report.outcome {
            CycleOutcome::Aborted { reason } => tracing::warn!(
                synced = report.synced.len(),
                failed = report.failed.len(),
                %reason,
                "sync cycle aborted"
            ),
            _ => tracing::info!(
                synced = report.synced.len(),
                failed = report.failed.len(),
                resent = report.resent,
                deferred = report.deferred,
                "sync cycle completed"
            ),
        }
        report
    }

    async fn drain(&self, remote: &mut R) -> CycleReport {
        let mut report = CycleReport::new(CycleOutcome::Completed);
        let mut blocked: HashSet<RecordKind> = HashSet::new();
        let limit = match self.config.batch_size {
            0 => usize::MAX,
            n => n,
        };
        let mut sent = 0usize;

        if let Err(e) = self.queue.refresh() {
            tracing::warn!(error = %e, "failed to read records from other processes");
        }

        for record in self.queue.snapshot_pending() {
            if sent >= limit {
                break;
            }

            match record.sync_state {
                SyncState::Failed if !record.is_auto_retryable(self.config.max_attempts) => {
                    report.skipped += 1;
                    continue;
                }
                _ if is_held_back(&blocked, record.kind) => {
                    report.deferred += 1;
                    continue;
                }
                SyncState::Synced => continue,
                _ => {}
            }

            if !self.is_online() {
                report.outcome = CycleOutcome::Aborted {
                    reason: "went offline".to_string(),
                };
                break;
            }

            match self.dispatch(&record, &mut report) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(reason) => {
                    report.outcome = CycleOutcome::Aborted { reason };
                    break;
                }
            }

            sent += 1;
            let id = record.id.clone();
            let kind = record.kind;
            let attempts = record.attempt_count;
            match self.deliver(remote, record).await {
                Ok(ack) => {
                    if let Err(e) = self.queue.mark_synced(&ack.id) {
                        report.outcome = CycleOutcome::Aborted {
                            reason: e.to_string(),
                        };
                        break;
                    }
                    report.synced.push(ack.id);
                }
                Err(e) if e.class() == FailureClass::Connectivity => {
                    report.outcome = CycleOutcome::Aborted {
                        reason: e.to_string(),
                    };
                    if !self.is_online() || matches!(e, RemoteError::Unreachable(_)) {
                        tracing::info!(id = %id, error = %e, "lost remote mid-cycle, leaving record in flight");
                    } else if let Err(local) = self.unconfirmed(&id, attempts, &e, &mut report) {
                        report.outcome = CycleOutcome::Aborted {
                            reason: local.to_string(),
                        };
                    }
                    break;
                }
                Err(e) => {
                    let failure = match e.class() {
                        FailureClass::Permanent => SyncFailure::permanent(e.to_string()),
                        _ => SyncFailure::transient(e.to_string()),
                    };
                    tracing::warn!(id = %id, %failure, "record failed to sync");
                    match self.queue.mark_failed(&id, failure.clone()) {
                        Ok(updated) => {
                            if updated.is_auto_retryable(self.config.max_attempts) {
                                report.retryable += 1;
                                blocked.insert(kind);
                            }
                            report.failed.push((id, failure));
                        }
                        Err(e) => {
                            report.outcome = CycleOutcome::Aborted {
                                reason: e.to_string(),
                            };
                            break;
                        }
                    }
                }
            }
        }
        report
    }

    /// Charge an unanswered send to the record.
    ///
    /// Below the cap the record stays in flight for a resend; at the cap it is
    /// marked failed and no longer retried automatically.
    fn unconfirmed(
        &self,
        id: &RecordId,
        attempts: u32,
        error: &RemoteError,
        report: &mut CycleReport,
    ) -> stride_core::Result<()> {
        report.unconfirmed += 1;
        if attempts.saturating_add(1) < self.config.max_attempts {
            let record = self.queue.mark_unconfirmed(id)?;
            tracing::info!(
                id = %id,
                attempts = record.attempt_count,
                error = %error,
                "no answer from remote, leaving record in flight"
            );
            return Ok(());
        }

        let failure = SyncFailure::transient(format!(
            "no answer after {} attempts: {}",
            attempts.saturating_add(1),
            error
        ));
        tracing::warn!(id = %id, %failure, "giving up on unanswered record");
        self.queue.mark_failed(id, failure.clone())?;
        report.failed.push((id.clone(), failure));
        Ok(())
    }

    /// Put a record in flight ahead of sending it.
    ///
    /// Returns `Ok(false)` if the record changed state under us and must not
    /// be sent.
    fn dispatch(&self, record: &QueuedRecord, report: &mut CycleReport) -> Result<bool, String> {
        match record.sync_state {
            SyncState::InFlight => {
                tracing::debug!(id = %record.id, "resending record with unknown outcome");
                report.resent += 1;
                Ok(true)
            }
            SyncState::Failed => {
                self.queue.retry(&record.id).map_err(|e| e.to_string())?;
                report.retried += 1;
                self.queue.mark_in_flight(&record.id).map_err(|e| e.to_string())
            }
            SyncState::Pending | SyncState::Synced => {
                self.queue.mark_in_flight(&record.id).map_err(|e| e.to_string())
            }
        }
    }

    /// Send one record, racing the write timeout and loss of connectivity.
    async fn deliver(&self, remote: &mut R, record: QueuedRecord) -> RemoteResult<Ack> {
        let mut connectivity = self.connectivity.clone();
        tokio::select! {
            result = tokio::time::timeout(self.config.write_timeout, remote.send(record)) => {
                result.unwrap_or(Err(RemoteError::Timeout))
            }
            _ = went_offline(&mut connectivity) => Err(RemoteError::ConnectionLost),
        }
    }

    /// Drive cycles until cancelled or shut down through a handle.
    ///
    /// Runs a cycle right away if online, then on every trigger. Failed
    /// cycles back off exponentially; a manual trigger or reconnect cuts the
    /// wait short.
    pub async fn run(&self, cancel: CancellationToken) {
        let taken = self
            .trigger_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(mut triggers) = taken else {
            tracing::warn!("sync coordinator is already running");
            return;
        };

        let mut connectivity = self.connectivity.clone();
        let mut backoff = Backoff::new(self.config.initial_delay, self.config.max_delay);
        let mut next = connectivity
            .borrow_and_update()
            .is_online()
            .then_some(Trigger::Reconnected);

        loop {
            let trigger = match next.take() {
                Some(trigger) => trigger,
                None => {
                    self.state.set(SyncPhase::Idle);
                    tokio::select! {
                        _ = self.stopped(&cancel) => break,
                        trigger = triggers.recv() => match trigger {
                            Some(trigger) => trigger,
                            None => break,
                        },
                        _ = online_edge(&mut connectivity) => Trigger::Reconnected,
                    }
                }
            };

            if !self.is_online() {
                tracing::debug!(?trigger, "offline, waiting for connectivity");
                continue;
            }
            tracing::debug!(?trigger, "starting sync cycle");

            let report = tokio::select! {
                _ = self.stopped(&cancel) => break,
                report = self.run_cycle() => report,
            };

            if !report.needs_backoff() {
                backoff.reset();
                continue;
            }

            let delay = backoff.next_delay();
            let until_ms = chrono::Utc::now().timestamp_millis().max(0) as u64
                + delay.as_millis() as u64;
            self.state.set(SyncPhase::Backoff {
                attempt: backoff.attempt(),
                until_ms,
            });
            tracing::info!(
                attempt = backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "backing off before next sync"
            );

            match self
                .wait_backoff(delay, &mut triggers, &mut connectivity, &cancel)
                .await
            {
                Some(trigger) => next = Some(trigger),
                None => break,
            }
        }

        self.state.set(SyncPhase::Idle);
        tracing::info!("sync coordinator stopped");
    }

    /// Wait out a backoff. Returns `None` on shutdown.
    async fn wait_backoff(
        &self,
        delay: Duration,
        triggers: &mut mpsc::Receiver<Trigger>,
        connectivity: &mut watch::Receiver<Connectivity>,
        cancel: &CancellationToken,
    ) -> Option<Trigger> {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = self.stopped(cancel) => return None,
                _ = &mut sleep => return Some(Trigger::BackoffElapsed),
                _ = online_edge(connectivity) => return Some(Trigger::Reconnected),
                trigger = triggers.recv() => match trigger {
                    Some(Trigger::Manual) => return Some(Trigger::Manual),
                    Some(other) => tracing::debug!(trigger = ?other, "ignored during backoff"),
                    None => return None,
                },
            }
        }
    }

    async fn stopped(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = self.shutdown.cancelled() => {}
        }
    }
}

/// True if an earlier failure this cycle blocks `kind`, directly or through
/// the kind it depends on.
fn is_held_back(blocked: &HashSet<RecordKind>, kind: RecordKind) -> bool {
    blocked.contains(&kind) || kind.depends_on().is_some_and(|parent| blocked.contains(&parent))
}

/// Resolves when the watch reports an offline to online edge.
async fn online_edge(rx: &mut watch::Receiver<Connectivity>) {
    loop {
        if rx.changed().await.is_err() {
            // Publisher gone; no edge will ever come.
            std::future::pending::<()>().await;
        }
        if rx.borrow_and_update().is_online() {
            return;
        }
    }
}

/// Resolves once the watch reads offline.
async fn went_offline(rx: &mut watch::Receiver<Connectivity>) {
    let offline = rx.wait_for(|status| !status.is_online()).await.is_ok();
    if !offline {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
