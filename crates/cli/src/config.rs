// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration and state directory layout.
//!
//! Configuration is read from `<state>/config.toml`. Every field has a
//! default, so a missing file or a partial one is fine:
//!
//! ```toml
//! [remote]
//! url = "ws://localhost:7890"
//!
//! [sync]
//! max_attempts = 5
//! batch_size = 0
//! write_timeout_ms = 10000
//! initial_delay_ms = 500
//! max_delay_secs = 60
//! journal_poll_ms = 1000
//!
//! [connectivity]
//! debounce_ms = 2000
//! probe_interval_ms = 5000
//! probe_timeout_ms = 2000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::{Error, Result};
use crate::sync::{MonitorConfig, SyncConfig};

const STATE_DIR_NAME: &str = "stride";
const CONFIG_FILE_NAME: &str = "config.toml";
const QUEUE_FILE_NAME: &str = "queue.jsonl";
const LOG_FILE_NAME: &str = "stride.log";

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub connectivity: ConnectivitySettings,
}

/// Where records are delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL of the remote store (`ws://` or `wss://`).
    #[serde(default = "default_url")]
    pub url: String,
}

/// Delivery and retry tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Failures after which a transient error is no longer retried automatically.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Records handled per cycle (0 = unbounded).
    #[serde(default)]
    pub batch_size: usize,
    /// Max time to wait for an ack per record.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// First backoff delay after an aborted cycle.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Backoff ceiling.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    /// How often `stride run` checks the journal for records other processes added.
    #[serde(default = "default_journal_poll_ms")]
    pub journal_poll_ms: u64,
}

/// Connectivity probing and debounce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivitySettings {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_url() -> String {
    "ws://localhost:7890".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_secs() -> u64 {
    60
}

fn default_journal_poll_ms() -> u64 {
    1_000
}

fn default_debounce_ms() -> u64 {
    2_000
}

fn default_probe_interval_ms() -> u64 {
    5_000
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig { url: default_url() }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            max_attempts: default_max_attempts(),
            batch_size: 0,
            write_timeout_ms: default_write_timeout_ms(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_secs: default_max_delay_secs(),
            journal_poll_ms: default_journal_poll_ms(),
        }
    }
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        ConnectivitySettings {
            debounce_ms: default_debounce_ms(),
            probe_interval_ms: default_probe_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Config {
    /// Loads `config.toml` from the state directory, or defaults if absent.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let config_path = state_dir.join(CONFIG_FILE_NAME);
        let content = match fs::read_to_string(&config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(Error::Config(format!("failed to read config: {}", e))),
        };
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to the state directory.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        fs::create_dir_all(state_dir)?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(state_dir.join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }

    /// Rejects values the sync engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let url = &self.remote.url;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "invalid remote URL '{}'\n  hint: the URL must start with ws:// or wss://",
                url
            )));
        }
        if self.sync.max_attempts == 0 {
            return Err(Error::Config(
                "sync.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.sync.initial_delay_ms == 0 {
            return Err(Error::Config(
                "sync.initial_delay_ms must be greater than 0".to_string(),
            ));
        }
        if self.sync.journal_poll_ms == 0 {
            return Err(Error::Config(
                "sync.journal_poll_ms must be greater than 0".to_string(),
            ));
        }
        if self.connectivity.probe_interval_ms == 0 {
            return Err(Error::Config(
                "connectivity.probe_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Coordinator settings derived from `[sync]`.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_attempts: self.sync.max_attempts,
            batch_size: self.sync.batch_size,
            write_timeout: Duration::from_millis(self.sync.write_timeout_ms),
            initial_delay: Duration::from_millis(self.sync.initial_delay_ms),
            max_delay: Duration::from_secs(self.sync.max_delay_secs),
        }
    }

    /// Monitor settings derived from `[connectivity]`.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            debounce: Duration::from_millis(self.connectivity.debounce_ms),
        }
    }

    /// Interval between reachability probes.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.connectivity.probe_interval_ms)
    }

    /// Interval between checks for records added by other processes.
    pub fn journal_poll(&self) -> Duration {
        Duration::from_millis(self.sync.journal_poll_ms)
    }

    /// Connect timeout for a single reachability probe.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.connectivity.probe_timeout_ms)
    }
}

/// Resolves the state directory.
///
/// Precedence: explicit flag, `STRIDE_STATE_DIR`, `$XDG_STATE_HOME/stride`,
/// then `~/.local/state/stride`.
pub fn resolve_state_dir(flag: Option<&Path>) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    if let Some(dir) = env::state_dir() {
        return dir;
    }
    if let Some(dir) = env::xdg_state_home() {
        return dir.join(STATE_DIR_NAME);
    }
    dirs::home_dir()
        .map(|h| h.join(".local/state").join(STATE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".local/state").join(STATE_DIR_NAME))
}

/// Path of the queue journal inside a state directory.
pub fn queue_path(state_dir: &Path) -> PathBuf {
    state_dir.join(QUEUE_FILE_NAME)
}

/// Path of the `stride run` log file inside a state directory.
pub fn log_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOG_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
