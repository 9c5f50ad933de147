// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("stride").chain(args.iter().copied()))
}

#[test]
fn test_cli_is_well_formed() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}

#[parameterized(
    assessment = { "assessment", RecordKind::Assessment },
    video = { "video", RecordKind::Video },
    analysis = { "analysis-result", RecordKind::AnalysisResult },
)]
fn test_enqueue_parses_kind(arg: &str, expected: RecordKind) {
    let cli = parse(&["enqueue", arg, "{}"]).unwrap();
    match cli.command {
        Command::Enqueue { kind, payload } => {
            assert_eq!(kind, expected);
            assert_eq!(payload, "{}");
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_enqueue_rejects_unknown_kind() {
    let err = parse(&["enqueue", "workout", "{}"]).err().unwrap();
    assert!(err.to_string().contains("workout"));
}

#[test]
fn test_output_defaults_to_text() {
    let cli = parse(&["status"]).unwrap();
    assert!(matches!(cli.command, Command::Status { output: OutputFormat::Text }));

    let cli = parse(&["list", "-o", "json"]).unwrap();
    assert!(matches!(cli.command, Command::List { output: OutputFormat::Json }));
}

#[test]
fn test_retry_requires_ids_or_all() {
    assert!(parse(&["retry"]).is_err());
    assert!(parse(&["retry", "rec-1", "--all"]).is_err());

    let cli = parse(&["retry", "--all"]).unwrap();
    assert!(matches!(cli.command, Command::Retry { all: true, .. }));
}

#[test]
fn test_state_dir_is_global() {
    let cli = parse(&["status", "--state-dir", "/tmp/stride"]).unwrap();
    assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/stride")));
}
