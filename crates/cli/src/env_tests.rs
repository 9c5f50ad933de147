// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::path::PathBuf;
use std::sync::Mutex;

// Tests in this file mutate process-wide environment variables.
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn test_vars_constants() {
    assert_eq!(vars::STRIDE_STATE_DIR, "STRIDE_STATE_DIR");
    assert_eq!(vars::STRIDE_LOG, "STRIDE_LOG");
    assert_eq!(vars::RUST_LOG, "RUST_LOG");
    assert_eq!(vars::XDG_STATE_HOME, "XDG_STATE_HOME");
}

#[test]
fn test_state_dir_unset_and_set() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::remove_var("STRIDE_STATE_DIR");
    assert_eq!(state_dir(), None);

    std::env::set_var("STRIDE_STATE_DIR", "/tmp/stride-test");
    assert_eq!(state_dir(), Some(PathBuf::from("/tmp/stride-test")));
    std::env::remove_var("STRIDE_STATE_DIR");
}

#[test]
fn test_xdg_state_home_unset_and_set() {
    let _guard = ENV_LOCK.lock().unwrap();
    let saved = std::env::var("XDG_STATE_HOME").ok();
    std::env::remove_var("XDG_STATE_HOME");
    assert_eq!(xdg_state_home(), None);

    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg-test");
    assert_eq!(xdg_state_home(), Some(PathBuf::from("/tmp/xdg-test")));

    match saved {
        Some(v) => std::env::set_var("XDG_STATE_HOME", v),
        None => std::env::remove_var("XDG_STATE_HOME"),
    }
}

#[test]
fn test_log_filter_precedence() {
    let _guard = ENV_LOCK.lock().unwrap();
    let saved = std::env::var("RUST_LOG").ok();
    std::env::remove_var("RUST_LOG");
    std::env::remove_var("STRIDE_LOG");
    assert_eq!(log_filter(), None);

    std::env::set_var("STRIDE_LOG", "debug");
    assert_eq!(log_filter().as_deref(), Some("debug"));

    std::env::set_var("RUST_LOG", "trace");
    assert_eq!(log_filter().as_deref(), Some("trace"));

    std::env::remove_var("STRIDE_LOG");
    match saved {
        Some(v) => std::env::set_var("RUST_LOG", v),
        None => std::env::remove_var("RUST_LOG"),
    }
}
