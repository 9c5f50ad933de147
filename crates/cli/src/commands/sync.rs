// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use crate::sync::{CycleOutcome, CycleReport, SyncCoordinator, WebSocketRemote};

use super::{probe, runtime, Context};

#[derive(Debug, Serialize)]
struct SyncSummary<'a> {
    synced: usize,
    failed: Vec<FailedRecord<'a>>,
    resent: usize,
    retried: usize,
    deferred: usize,
    skipped: usize,
    unconfirmed: usize,
}

#[derive(Debug, Serialize)]
struct FailedRecord<'a> {
    id: &'a str,
    reason: &'a str,
}

pub fn run(ctx: &Context, format: OutputFormat) -> Result<()> {
    let queue = Arc::new(ctx.open_queue()?);
    let report = runtime()?.block_on(async {
        let connectivity = probe(&ctx.config).await;
        let (_network, network_rx) = watch::channel(connectivity);
        let remote = WebSocketRemote::new(ctx.config.remote.url.as_str());
        let (coordinator, _) =
            SyncCoordinator::new(queue, remote, network_rx, ctx.config.sync_config());
        coordinator.run_cycle().await
    });

    match &report.outcome {
        CycleOutcome::Offline => return Err(Error::Offline),
        CycleOutcome::Aborted { reason } => {
            print_report(&report, format)?;
            return Err(Error::SyncAborted(reason.clone()));
        }
        CycleOutcome::Completed | CycleOutcome::AlreadySyncing => {}
    }
    print_report(&report, format)
}

fn print_report(report: &CycleReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", format_text(report)),
        OutputFormat::Json => println!("{}", format_json(report)?),
    }
    Ok(())
}

pub(crate) fn format_text(report: &CycleReport) -> String {
    let mut out = format!("Synced {}\n", super::items(report.synced.len()));
    for (id, failure) in &report.failed {
        out.push_str(&format!("Failed {}: {}\n", id, failure));
    }
    let notes = [
        (report.resent, "resent after an interrupted sync"),
        (report.unconfirmed, "got no answer from the remote"),
        (report.deferred, "deferred behind an earlier failure"),
        (report.skipped, "need attention (run 'stride retry')"),
    ];
    for (count, note) in notes {
        if count > 0 {
            out.push_str(&format!("{} {}\n", super::items(count), note));
        }
    }
    out
}

pub(crate) fn format_json(report: &CycleReport) -> Result<String> {
    let summary = SyncSummary {
        synced: report.synced.len(),
        failed: report
            .failed
            .iter()
            .map(|(id, failure)| FailedRecord {
                id: id.as_str(),
                reason: &failure.reason,
            })
            .collect(),
        resent: report.resent,
        retried: report.retried,
        deferred: report.deferred,
        skipped: report.skipped,
        unconfirmed: report.unconfirmed,
    };
    Ok(serde_json::to_string(&summary)?)
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
