// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;
use stride_core::{FailureKind, MutationQueue, QueueStats};

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::sync::Connectivity;

use super::{items, probe, runtime, Context, OFFLINE_BANNER};

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    online: bool,
    pending: usize,
    in_flight: usize,
    failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<LastError<'a>>,
}

#[derive(Debug, Serialize)]
struct LastError<'a> {
    id: &'a str,
    kind: FailureKind,
    reason: &'a str,
}

pub fn run(ctx: &Context, format: OutputFormat) -> Result<()> {
    // Read-only: works while `stride run` owns the queue.
    let (_, stats) = MutationQueue::load_snapshot(&ctx.queue_path())?;
    let connectivity = runtime()?.block_on(probe(&ctx.config));

    match format {
        OutputFormat::Text => print!("{}", format_text(connectivity, &stats)),
        OutputFormat::Json => println!("{}", format_json(connectivity, &stats)?),
    }
    Ok(())
}

pub(crate) fn format_text(connectivity: Connectivity, stats: &QueueStats) -> String {
    let mut out = format!("{}\n{} pending sync\n", connectivity, items(stats.total()));
    if stats.total() > 0 {
        out.push_str(&format!(
            "  pending: {}, in flight: {}, failed: {}\n",
            stats.pending, stats.in_flight, stats.failed
        ));
    }
    if let Some((id, failure)) = &stats.last_error {
        out.push_str(&format!("Last error: {} {}\n", id, failure));
    }
    if !connectivity.is_online() {
        out.push_str(OFFLINE_BANNER);
        out.push('\n');
    }
    out
}

pub(crate) fn format_json(connectivity: Connectivity, stats: &QueueStats) -> Result<String> {
    let report = StatusReport {
        online: connectivity.is_online(),
        pending: stats.pending,
        in_flight: stats.in_flight,
        failed: stats.failed,
        last_error: stats.last_error.as_ref().map(|(id, failure)| LastError {
            id: id.as_str(),
            kind: failure.kind,
            reason: &failure.reason,
        }),
    };
    Ok(serde_json::to_string(&report)?)
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
