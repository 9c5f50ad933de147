// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity monitoring.
//!
//! Raw reachability observations come from a [`NetworkEvents`] source and
//! pass through a [`Debouncer`] before they are published. Consumers read
//! the published state synchronously via [`ConnectivityMonitor::current_status`],
//! register edge callbacks, or hold a `watch` receiver.
//!
//! The monitor fails closed: it starts `Offline`, a failed probe reads as
//! `Offline`, and a source that goes away leaves it `Offline`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_util::sync::CancellationToken;

const STATE_OFFLINE: u8 = 0;
const STATE_ONLINE: u8 = 1;

/// Whether the remote store is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }

    fn encode(self) -> u8 {
        match self {
            Connectivity::Online => STATE_ONLINE,
            Connectivity::Offline => STATE_OFFLINE,
        }
    }

    fn decode(value: u8) -> Self {
        if value == STATE_ONLINE {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => write!(f, "Online"),
            Connectivity::Offline => write!(f, "Offline"),
        }
    }
}

/// A reachability check that could not produce an answer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("probe failed: {0}")]
pub struct ProbeError(pub String);

/// Source of raw connectivity observations.
pub trait NetworkEvents: Send {
    /// Next raw observation.
    ///
    /// Returns `None` once the source is gone for good.
    fn next_event(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Option<Result<Connectivity, ProbeError>>> + Send + '_>>;
}

/// Settles a noisy stream of raw observations.
///
/// The first observation is published immediately. After that, every raw
/// change restarts a settle window; when the window elapses the settled
/// state is published only if it differs from what was last published.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    published: Option<Connectivity>,
    raw: Connectivity,
    settle_at: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            published: None,
            raw: Connectivity::Offline,
            settle_at: None,
        }
    }

    /// Last state handed out by `observe` or `poll`.
    pub fn published(&self) -> Option<Connectivity> {
        self.published
    }

    /// When the pending settle window closes, if one is open.
    pub fn deadline(&self) -> Option<Instant> {
        self.settle_at
    }

    /// Feed a raw observation. Returns a state to publish, if any.
    pub fn observe(&mut self, raw: Connectivity, now: Instant) -> Option<Connectivity> {
        if self.published.is_none() {
            self.raw = raw;
            self.published = Some(raw);
            return Some(raw);
        }
        if raw != self.raw {
            self.raw = raw;
            self.settle_at = Some(now + self.window);
        }
        self.poll(now)
    }

    /// Close the settle window if it has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Connectivity> {
        match self.settle_at {
            Some(at) if at <= now => {
                self.settle_at = None;
                if self.published == Some(self.raw) {
                    None
                } else {
                    self.published = Some(self.raw);
                    Some(self.raw)
                }
            }
            _ => None,
        }
    }
}

/// Monitor tuning.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Settle window for raw changes.
    pub debounce: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            debounce: Duration::from_millis(2_000),
        }
    }
}

type StatusCallback = Arc<dyn Fn(Connectivity) + Send + Sync>;

/// Publishes debounced connectivity.
pub struct ConnectivityMonitor {
    config: MonitorConfig,
    state: AtomicU8,
    tx: watch::Sender<Connectivity>,
    callbacks: Mutex<Vec<StatusCallback>>,
}

impl ConnectivityMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let (tx, _rx) = watch::channel(Connectivity::Offline);
        ConnectivityMonitor {
            config,
            state: AtomicU8::new(STATE_OFFLINE),
            tx,
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Published state. Never blocks.
    pub fn current_status(&self) -> Connectivity {
        Connectivity::decode(self.state.load(Ordering::Acquire))
    }

    /// Register a callback invoked on every published edge.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(Connectivity) + Send + Sync + 'static,
    {
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(callback));
    }

    /// Receiver for async consumers.
    pub fn watch(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }

    fn publish(&self, status: Connectivity) {
        let previous = self.state.swap(status.encode(), Ordering::AcqRel);
        if previous == status.encode() {
            return;
        }
        self.tx.send_replace(status);
        tracing::info!(%status, "connectivity changed");

        let callbacks: Vec<StatusCallback> = self
            .callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for callback in callbacks {
            callback(status);
        }
    }

    /// Drive the monitor until `cancel` fires or the source ends.
    pub async fn run<E: NetworkEvents>(&self, mut events: E, cancel: CancellationToken) {
        let mut debouncer = Debouncer::new(self.config.debounce);

        loop {
            let deadline = debouncer.deadline();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep_until(deadline) => {
                    if let Some(status) = debouncer.poll(Instant::now()) {
                        self.publish(status);
                    }
                }
                event = events.next_event() => {
                    let raw = match event {
                        Some(Ok(status)) => status,
                        Some(Err(e)) => {
                            tracing::debug!(error = %e, "connectivity probe failed");
                            Connectivity::Offline
                        }
                        None => {
                            tracing::warn!("network event source ended, assuming offline");
                            self.publish(Connectivity::Offline);
                            break;
                        }
                    };
                    if let Some(status) = debouncer.observe(raw, Instant::now()) {
                        self.publish(status);
                    }
                }
            }
        }
    }
}

impl fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("status", &self.current_status())
            .field("config", &self.config)
            .finish()
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Event source fed through a channel.
pub struct ChannelEvents {
    rx: mpsc::Receiver<Result<Connectivity, ProbeError>>,
}

impl ChannelEvents {
    /// Create a source and the sender that feeds it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Result<Connectivity, ProbeError>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, ChannelEvents { rx })
    }
}

impl NetworkEvents for ChannelEvents {
    fn next_event(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Option<Result<Connectivity, ProbeError>>> + Send + '_>> {
        Box::pin(self.rx.recv())
    }
}

/// Polls TCP reachability of the remote host.
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
    ticker: Interval,
}

impl TcpProbe {
    /// Probe the host and port of a `ws://` or `wss://` URL.
    pub fn for_url(url: &str, interval: Duration, timeout: Duration) -> Result<Self, ProbeError> {
        let addr = probe_addr(url)?;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Ok(TcpProbe {
            addr,
            timeout,
            ticker,
        })
    }

    /// Single reachability check against `host:port`.
    pub async fn probe_once(addr: &str, timeout: Duration) -> Result<Connectivity, ProbeError> {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => Ok(Connectivity::Online),
            Ok(Err(e)) => Err(ProbeError(e.to_string())),
            Err(_) => Ok(Connectivity::Offline),
        }
    }
}

impl NetworkEvents for TcpProbe {
    fn next_event(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Option<Result<Connectivity, ProbeError>>> + Send + '_>> {
        Box::pin(async move {
            self.ticker.tick().await;
            Some(Self::probe_once(&self.addr, self.timeout).await)
        })
    }
}

/// `host:port` for a WebSocket URL, with the scheme's default port.
pub fn probe_addr(url: &str) -> Result<String, ProbeError> {
    let uri: Uri = url
        .parse()
        .map_err(|e| ProbeError(format!("invalid remote URL '{}': {}", url, e)))?;
    let host = uri
        .host()
        .ok_or_else(|| ProbeError(format!("remote URL '{}' has no host", url)))?;
    let port = match (uri.port_u16(), uri.scheme_str()) {
        (Some(port), _) => port,
        (None, Some("wss")) => 443,
        (None, Some("ws")) => 80,
        (None, _) => return Err(ProbeError(format!("unsupported URL scheme in '{}'", url))),
    };
    Ok(format!("{}:{}", host, port))
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
