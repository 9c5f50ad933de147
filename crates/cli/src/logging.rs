// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup.
//!
//! The filter comes from `RUST_LOG` or `STRIDE_LOG`. Long-running `stride run`
//! appends to the state directory log file; one-shot commands log to stderr
//! and stay quiet unless something goes wrong.

use std::fs;
use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::env;

const DAEMON_DEFAULT_LEVEL: &str = "info";
const ONESHOT_DEFAULT_LEVEL: &str = "warn";

/// Build the filter, falling back to `default` if unset or unparsable.
pub fn env_filter(default: &str) -> EnvFilter {
    env::log_filter()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

/// Logging for `stride run`: append to `log_path`, or stderr if it cannot be opened.
pub fn init_for_run(log_path: &Path) {
    let filter = env_filter(DAEMON_DEFAULT_LEVEL);

    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    if let Ok(file) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Logging for one-shot commands: stderr at `warn` by default.
pub fn init_for_command() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(ONESHOT_DEFAULT_LEVEL))
        .with_writer(std::io::stderr)
        .try_init();
}
