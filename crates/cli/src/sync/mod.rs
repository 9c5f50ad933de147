// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline sync engine.
//!
//! - [`connectivity`]: debounced reachability monitoring
//! - [`coordinator`]: drains the mutation queue into the remote store
//! - [`transport`]: the remote store abstraction and its WebSocket client

pub mod backoff;
pub mod connectivity;
pub mod coordinator;
pub mod state;
pub mod transport;

pub use backoff::Backoff;
pub use connectivity::{
    ChannelEvents, Connectivity, ConnectivityMonitor, Debouncer, MonitorConfig, NetworkEvents,
    ProbeError, TcpProbe,
};
pub use coordinator::{CycleOutcome, CycleReport, SyncConfig, SyncCoordinator, SyncHandle, Trigger};
pub use state::{SharedSyncState, SyncPhase};
pub use transport::{Ack, FailureClass, RemoteError, RemoteResult, RemoteStore, WebSocketRemote};
