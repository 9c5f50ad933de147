// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod common;
use common::*;

#[test]
fn status_offline_shows_banner_and_count() {
    let state = offline_state();
    enqueue(&state, "assessment", r#"{"score": 87}"#);
    enqueue(&state, "video", "{}");

    stride(&state)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Offline\n"))
        .stdout(predicate::str::contains("2 items pending sync"))
        .stdout(predicate::str::contains(
            "You're offline. Data will be saved locally and synced when connection is restored.",
        ));
}

#[test]
fn status_online_when_remote_listens() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let state = state_with_remote(&format!("ws://{}", listener.local_addr().unwrap()));

    stride(&state)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Online\n0 items pending sync\n"))
        .stdout(predicate::str::contains("You're offline").not());
}

#[test]
fn status_json() {
    let state = offline_state();
    enqueue(&state, "video", "{}");

    let output = stride(&state).args(["status", "-o", "json"]).output().unwrap();
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(json["online"], false);
    assert_eq!(json["pending"], 1);
    assert_eq!(json["failed"], 0);
}

#[test]
fn invalid_config_is_reported() {
    let state = TempDir::new().unwrap();
    std::fs::write(
        state.path().join("config.toml"),
        "[remote]\nurl = \"http://localhost:7890\"\n",
    )
    .unwrap();

    stride(&state)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ws:// or wss://"));
}
