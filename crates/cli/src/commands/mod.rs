// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod enqueue;
pub mod list;
pub mod retry;
pub mod run;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};

use stride_core::MutationQueue;

use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::sync::connectivity::probe_addr;
use crate::sync::{Connectivity, TcpProbe};

/// Banner shown whenever the remote cannot be reached.
pub const OFFLINE_BANNER: &str =
    "You're offline. Data will be saved locally and synced when connection is restored.";

/// Resolved state directory and its configuration.
#[derive(Debug, Clone)]
pub struct Context {
    pub state_dir: PathBuf,
    pub config: Config,
}

impl Context {
    /// Load `config.toml` from the state directory.
    pub fn load(state_dir: &Path) -> Result<Self> {
        Ok(Context {
            state_dir: state_dir.to_path_buf(),
            config: Config::load(state_dir)?,
        })
    }

    pub fn queue_path(&self) -> PathBuf {
        config::queue_path(&self.state_dir)
    }

    /// Open the queue, taking ownership of it for this process.
    pub fn open_queue(&self) -> Result<MutationQueue> {
        Ok(MutationQueue::open(&self.queue_path())?)
    }
}

/// Runtime for commands that touch the network.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Io(std::io::Error::other(format!("tokio: {}", e))))
}

/// One reachability check against the configured remote.
pub(crate) async fn probe(config: &Config) -> Connectivity {
    let addr = match probe_addr(&config.remote.url) {
        Ok(addr) => addr,
        Err(e) => {
            tracing::warn!(error = %e, "cannot probe remote");
            return Connectivity::Offline;
        }
    };
    match TcpProbe::probe_once(&addr, config.probe_timeout()).await {
        Ok(status) => status,
        Err(e) => {
            tracing::debug!(error = %e, "remote not reachable");
            Connectivity::Offline
        }
    }
}

/// `"1 item"` / `"3 items"`.
pub(crate) fn items(count: usize) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", count)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
