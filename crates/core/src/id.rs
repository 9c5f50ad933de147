// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::record::RecordKind;

/// Prefix shared by every record ID.
pub const ID_PREFIX: &str = "rec";

/// Generate a record ID from kind, creation time, node and per-process counter.
/// Format: rec-{hash} where hash is the first 16 hex chars of SHA256 over the inputs.
pub fn generate_id(kind: RecordKind, created_at: &DateTime<Utc>, node_id: u32, counter: u64) -> String {
    let input = format!(
        "{}|{}|{}|{}",
        kind,
        created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        node_id,
        counter
    );
    let hash = Sha256::digest(input.as_bytes());
    let short_hash = hex::encode(&hash[..8]); // First 16 hex chars (8 bytes)
    format!("{}-{}", ID_PREFIX, short_hash)
}

/// Generate a unique ID, handling collisions by appending incrementing suffix.
pub fn generate_unique_id<F>(
    kind: RecordKind,
    created_at: &DateTime<Utc>,
    node_id: u32,
    counter: u64,
    exists: F,
) -> String
where
    F: Fn(&str) -> bool,
{
    let base_id = generate_id(kind, created_at, node_id, counter);

    if !exists(&base_id) {
        return base_id;
    }

    let mut suffix = 2;
    loop {
        let id = format!("{}-{}", base_id, suffix);
        if !exists(&id) {
            return id;
        }
        suffix += 1;
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
