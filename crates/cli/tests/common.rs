// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// `stride` pointed at an isolated state directory.
pub fn stride(state: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("stride");
    cmd.arg("--state-dir")
        .arg(state.path())
        .env_remove("STRIDE_STATE_DIR")
        .env_remove("RUST_LOG")
        .env_remove("STRIDE_LOG");
    cmd
}

/// State directory whose remote is a closed local port.
pub fn offline_state() -> TempDir {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    state_with_remote(&format!("ws://{}", addr))
}

/// State directory configured for the given remote URL.
pub fn state_with_remote(url: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("config.toml"),
        format!(
            "[remote]\nurl = \"{}\"\n\n[connectivity]\nprobe_timeout_ms = 500\n\n[sync]\nwrite_timeout_ms = 2000\n",
            url
        ),
    )
    .unwrap();
    temp
}

/// Enqueue a record and return its ID.
pub fn enqueue(state: &TempDir, kind: &str, payload: &str) -> String {
    let output = stride(state)
        .args(["enqueue", kind, payload])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
