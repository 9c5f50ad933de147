// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use stride_core::{MutationQueue, RecordId, RecordKind};

use crate::error::{Error, Result};

use super::Context;

pub fn run(ctx: &Context, kind: RecordKind, payload: &str) -> Result<()> {
    let id = run_impl(&ctx.queue_path(), kind, payload)?;
    println!("{}", id);
    Ok(())
}

/// Internal implementation that accepts the journal path for testing.
///
/// Appends without owning the queue, so it works while `stride run` has it
/// open; the running coordinator picks the record up on its next refresh.
pub(crate) fn run_impl(queue_path: &Path, kind: RecordKind, payload: &str) -> Result<RecordId> {
    let payload = parse_payload(payload)?;
    Ok(MutationQueue::enqueue_at(queue_path, kind, payload)?)
}

fn parse_payload(payload: &str) -> Result<serde_json::Value> {
    let payload: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| Error::InvalidInput(format!("invalid payload JSON: {}", e)))?;
    if !payload.is_object() {
        return Err(Error::InvalidInput(
            "payload must be a JSON object\n  hint: wrap values in braces, e.g. '{\"score\": 87}'"
                .to_string(),
        ));
    }
    Ok(payload)
}

#[cfg(test)]
#[path = "enqueue_tests.rs"]
mod tests;
