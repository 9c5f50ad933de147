// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use stride_core::RecordKind;

/// Parse a record kind, with the same hints as the queue.
fn record_kind(s: &str) -> Result<RecordKind, String> {
    s.parse::<RecordKind>().map_err(|e| e.to_string())
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "stride")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline record queue and sync for the Stride fitness app")]
#[command(
    long_about = "Offline record queue and sync for the Stride fitness app.\n\n\
    Records are saved locally first and delivered to the remote store whenever \
    a connection is available."
)]
pub struct Cli {
    /// State directory holding the queue, config and log
    #[arg(long, global = true, value_name = "path")]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Save a record locally for delivery
    #[command(after_help = "\
Examples:
  stride enqueue assessment '{\"score\": 87}'
  stride enqueue video '{\"uri\": \"file:///clips/1.mp4\"}'
  stride enqueue analysis-result '{\"video\": \"rec-1a2b\", \"reps\": 12}'")]
    Enqueue {
        /// Record kind (assessment, video, analysis-result)
        #[arg(value_parser = record_kind)]
        kind: RecordKind,

        /// Record payload as JSON
        payload: String,
    },

    /// Show connectivity and queue counts
    Status {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// List records awaiting sync, oldest first
    List {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Move failed records back to pending
    Retry {
        /// Record IDs to retry
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        ids: Vec<String>,

        /// Retry every failed record
        #[arg(long)]
        all: bool,
    },

    /// Run one sync cycle now
    Sync {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Monitor connectivity and sync continuously until interrupted
    Run,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
