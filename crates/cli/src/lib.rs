// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! stride - offline record queue and sync for the Stride fitness app.
//!
//! Records created on the device are written to a durable local queue first
//! and delivered to the remote store whenever a connection is available.
//!
//! # Main Components
//!
//! - [`sync::ConnectivityMonitor`] - debounced online/offline detection
//! - [`sync::SyncCoordinator`] - drains the queue into the remote store
//! - [`sync::WebSocketRemote`] - the remote store client
//! - [`Config`] - tuning read from `config.toml` in the state directory
//!
//! The queue itself lives in `stride-core`.
//!
//! ```rust,ignore
//! use stride::sync::{ConnectivityMonitor, SyncCoordinator, TcpProbe, WebSocketRemote};
//!
//! let queue = Arc::new(MutationQueue::open(&queue_path(&state_dir))?);
//! let monitor = Arc::new(ConnectivityMonitor::new(config.monitor_config()));
//! let (coordinator, handle) = SyncCoordinator::new(
//!     queue,
//!     WebSocketRemote::new(config.remote.url.as_str()),
//!     monitor.watch(),
//!     config.sync_config(),
//! );
//! ```

mod cli;
mod commands;
mod logging;

pub mod config;
pub mod env;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command, OutputFormat};
pub use config::Config;
pub use error::{Error, Result};

/// Execute a parsed command line. This is the main entry point for the
/// binary and keeps command dispatch testable without process execution.
pub fn run(cli: Cli) -> Result<()> {
    let state_dir = config::resolve_state_dir(cli.state_dir.as_deref());
    match cli.command {
        Command::Run => logging::init_for_run(&config::log_path(&state_dir)),
        _ => logging::init_for_command(),
    }

    let ctx = commands::Context::load(&state_dir)?;
    match cli.command {
        Command::Enqueue { kind, payload } => commands::enqueue::run(&ctx, kind, &payload),
        Command::Status { output } => commands::status::run(&ctx, output),
        Command::List { output } => commands::list::run(&ctx, output),
        Command::Retry { ids, all } => commands::retry::run(&ctx, &ids, all),
        Command::Sync { output } => commands::sync::run(&ctx, output),
        Command::Run => commands::run::run(&ctx),
    }
}
