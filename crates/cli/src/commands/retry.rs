// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use stride_core::{MutationQueue, RecordId, SyncState};

use crate::error::Result;

use super::{items, Context};

pub fn run(ctx: &Context, ids: &[String], all: bool) -> Result<()> {
    let queue = ctx.open_queue()?;
    let retried = run_impl(&queue, ids, all)?;
    if all {
        println!("{} queued for retry", items(retried.len()));
    } else {
        for id in &retried {
            println!("Retrying {}", id);
        }
    }
    Ok(())
}

/// Internal implementation that accepts the queue for testing.
///
/// Explicit ids are all checked to exist and be failed before any is moved,
/// so one bad id does not leave the batch half applied.
pub(crate) fn run_impl(queue: &MutationQueue, ids: &[String], all: bool) -> Result<Vec<RecordId>> {
    if all {
        return Ok(queue.retry_all_failed()?);
    }

    let ids: Vec<RecordId> = ids.iter().map(|id| RecordId::new(id.as_str())).collect();
    for id in &ids {
        let record =
            queue.get(id).ok_or_else(|| stride_core::Error::RecordNotFound(id.to_string()))?;
        if record.sync_state != SyncState::Failed {
            return Err(stride_core::Error::InvalidTransition {
                id: id.to_string(),
                from: record.sync_state.to_string(),
                to: SyncState::Pending.to_string(),
            }
            .into());
        }
    }
    for id in &ids {
        queue.retry(id)?;
    }
    Ok(ids)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
