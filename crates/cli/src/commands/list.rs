// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use stride_core::{MutationQueue, QueuedRecord};

use crate::cli::OutputFormat;
use crate::error::Result;

use super::Context;

pub fn run(ctx: &Context, format: OutputFormat) -> Result<()> {
    let (records, _) = MutationQueue::load_snapshot(&ctx.queue_path())?;
    match format {
        OutputFormat::Text => {
            for record in &records {
                println!("{}", format_line(record));
            }
        }
        OutputFormat::Json => {
            // JSONL, one record per line
            for record in &records {
                println!("{}", serde_json::to_string(record)?);
            }
        }
    }
    Ok(())
}

pub(crate) fn format_line(record: &QueuedRecord) -> String {
    let mut line = format!(
        "{}  {:<15}  {:<9}  {}",
        record.id,
        record.kind.as_str(),
        record.sync_state.as_str(),
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
    );
    if record.attempt_count > 0 {
        line.push_str(&format!("  attempts: {}", record.attempt_count));
    }
    if let Some(failure) = &record.last_error {
        line.push_str(&format!("  {}", failure));
    }
    line
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
