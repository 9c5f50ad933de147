// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running sync: connectivity monitor plus coordinator until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use stride_core::{MutationQueue, QueueEvent};

use crate::error::{Error, Result};
use crate::sync::{
    Connectivity, ConnectivityMonitor, NetworkEvents, SyncCoordinator, TcpProbe, WebSocketRemote,
};

use super::{items, runtime, Context, OFFLINE_BANNER};

pub fn run(ctx: &Context) -> Result<()> {
    let queue = Arc::new(ctx.open_queue()?);
    let probe = TcpProbe::for_url(
        &ctx.config.remote.url,
        ctx.config.probe_interval(),
        ctx.config.probe_timeout(),
    )
    .map_err(|e| Error::Config(e.to_string()))?;

    eprintln!(
        "stride: syncing {} to {} (Ctrl-C to stop)",
        ctx.state_dir.display(),
        ctx.config.remote.url
    );

    runtime()?.block_on(async {
        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
            }
            shutdown.cancel();
        });
        run_until(ctx, queue, probe, cancel).await;
    });
    Ok(())
}

/// Run the monitor and coordinator until `cancel` fires.
pub(crate) async fn run_until<E>(
    ctx: &Context,
    queue: Arc<MutationQueue>,
    events: E,
    cancel: CancellationToken,
) where
    E: NetworkEvents + 'static,
{
    let monitor = Arc::new(ConnectivityMonitor::new(ctx.config.monitor_config()));
    monitor.subscribe(|status| {
        if status == Connectivity::Offline {
            tracing::warn!("{}", OFFLINE_BANNER);
        }
    });
    queue.subscribe(|event| {
        if let QueueEvent::Changed(stats) = event {
            tracing::debug!("{} pending sync", items(stats.total()));
        }
    });

    let coordinator = Arc::new(
        SyncCoordinator::new(
            Arc::clone(&queue),
            WebSocketRemote::new(ctx.config.remote.url.as_str()),
            monitor.watch(),
            ctx.config.sync_config(),
        )
        .0,
    );

    let monitor_task = {
        let monitor = Arc::clone(&monitor);
        let cancel = cancel.clone();
        tokio::spawn(async move { monitor.run(events, cancel).await })
    };
    let journal_task = {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        let period = ctx.config.journal_poll();
        tokio::spawn(async move { watch_journal(queue, period, cancel).await })
    };
    let coordinator_task = {
        let coordinator = Arc::clone(&coordinator);
        let cancel = cancel.clone();
        tokio::spawn(async move { coordinator.run(cancel).await })
    };

    tracing::info!(
        url = %ctx.config.remote.url,
        pending = queue.len(),
        "stride sync started"
    );

    if let Err(e) = monitor_task.await {
        tracing::error!(error = %e, "connectivity monitor task failed");
    }
    // The monitor stops early if its source ends; the coordinator runs until shutdown.
    cancel.cancelled().await;
    if let Err(e) = coordinator_task.await {
        tracing::error!(error = %e, "sync coordinator task failed");
    }
    if let Err(e) = journal_task.await {
        tracing::error!(error = %e, "journal watch task failed");
    }
    tracing::info!(pending = queue.len(), "stride sync stopped");
}

/// Pick up records other processes (`stride enqueue`) appended to the journal.
async fn watch_journal(queue: Arc<MutationQueue>, period: Duration, cancel: CancellationToken) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticks.tick() => match queue.refresh() {
                Ok(0) => {}
                Ok(n) => tracing::info!("picked up {} from other processes", items(n)),
                Err(e) => tracing::warn!(error = %e, "failed to read queue journal"),
            },
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
