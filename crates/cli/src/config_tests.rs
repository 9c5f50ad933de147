// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn test_missing_file_yields_defaults() {
    let temp = TempDir::new().unwrap();
    let config = Config::load(temp.path()).unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.remote.url, "ws://localhost:7890");
    assert_eq!(config.sync.max_attempts, 5);
    assert_eq!(config.sync.batch_size, 0);
    assert_eq!(config.sync.write_timeout_ms, 10_000);
    assert_eq!(config.sync.initial_delay_ms, 500);
    assert_eq!(config.sync.max_delay_secs, 60);
    assert_eq!(config.sync.journal_poll_ms, 1_000);
    assert_eq!(config.connectivity.debounce_ms, 2_000);
    assert_eq!(config.connectivity.probe_interval_ms, 5_000);
    assert_eq!(config.connectivity.probe_timeout_ms, 2_000);
}

#[test]
fn test_partial_file_fills_defaults() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.toml"),
        "[remote]\nurl = \"wss://sync.example.com/records\"\n\n[sync]\nmax_attempts = 3\n",
    )
    .unwrap();

    let config = Config::load(temp.path()).unwrap();
    assert_eq!(config.remote.url, "wss://sync.example.com/records");
    assert_eq!(config.sync.max_attempts, 3);
    assert_eq!(config.sync.write_timeout_ms, 10_000);
    assert_eq!(config.connectivity, ConnectivitySettings::default());
}

#[test]
fn test_save_and_load_round_trip() {
    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.sync.batch_size = 25;
    config.connectivity.debounce_ms = 100;
    config.save(temp.path()).unwrap();

    assert_eq!(Config::load(temp.path()).unwrap(), config);
}

#[test]
fn test_malformed_toml_is_config_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("config.toml"), "[sync\nmax_attempts = ").unwrap();

    let err = Config::load(temp.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("failed to parse config"));
}

#[parameterized(
    http = { "[remote]\nurl = \"http://localhost:7890\"\n", "ws:// or wss://" },
    zero_attempts = { "[sync]\nmax_attempts = 0\n", "max_attempts" },
    zero_delay = { "[sync]\ninitial_delay_ms = 0\n", "initial_delay_ms" },
    zero_journal_poll = { "[sync]\njournal_poll_ms = 0\n", "journal_poll_ms" },
    zero_probe_interval = { "[connectivity]\nprobe_interval_ms = 0\n", "probe_interval_ms" },
)]
fn test_invalid_values_rejected(content: &str, needle: &str) {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("config.toml"), content).unwrap();

    let err = Config::load(temp.path()).unwrap_err();
    assert!(err.to_string().contains(needle), "{}", err);
}

#[test]
fn test_sync_config_conversion() {
    let mut config = Config::default();
    config.sync.write_timeout_ms = 1_500;
    config.sync.max_delay_secs = 2;
    let sync = config.sync_config();

    assert_eq!(sync.max_attempts, 5);
    assert_eq!(sync.write_timeout, Duration::from_millis(1_500));
    assert_eq!(sync.initial_delay, Duration::from_millis(500));
    assert_eq!(sync.max_delay, Duration::from_secs(2));
    assert_eq!(config.monitor_config().debounce, Duration::from_secs(2));
    assert_eq!(config.probe_interval(), Duration::from_secs(5));
    assert_eq!(config.probe_timeout(), Duration::from_secs(2));
    assert_eq!(config.journal_poll(), Duration::from_secs(1));
}

#[test]
fn test_state_dir_flag_wins() {
    let dir = resolve_state_dir(Some(Path::new("/tmp/explicit")));
    assert_eq!(dir, PathBuf::from("/tmp/explicit"));
}

#[test]
fn test_layout_paths() {
    let state = Path::new("/var/lib/stride");
    assert_eq!(queue_path(state), PathBuf::from("/var/lib/stride/queue.jsonl"));
    assert_eq!(log_path(state), PathBuf::from("/var/lib/stride/stride.log"));
}
