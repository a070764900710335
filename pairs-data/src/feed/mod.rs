//! Live trade feed: one supervised WebSocket connection per instrument.
//!
//! Every connection decodes raw trade events into [`Tick`](crate::tick::Tick)s and pushes them
//! into a shared [`TickBuffer`]. Connections reconnect independently with their own backoff,
//! so one instrument's outage never stalls another.

use self::{
    backoff::BackoffPolicy,
    connection::{ConnectionContext, run_connection},
};
use crate::{buffer::TickBuffer, error::DataError, streams::timeout::DEFAULT_READ_TIMEOUT};
use smol_str::SmolStr;
use std::{
    collections::BTreeSet,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{info, warn};
use url::Url;

/// Reconnect policy shared by every connection.
pub mod backoff;

/// Supervised connection loop for a single instrument.
pub mod connection;

/// Serde helpers for exchange payloads.
pub mod de;

/// Trade message decoding.
pub mod message;

/// Binance USD-M futures raw stream endpoint.
pub const BINANCE_FUTURES_WS_URL: &str = "wss://fstream.binance.com/ws";

/// Default time allowed for a TCP + TLS + WebSocket handshake to complete.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for connection tasks to wind down during [`FeedClient::stop`].
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Feed client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Base WebSocket URL; per-instrument streams are `{base_url}/{symbol}@trade`
    pub base_url: String,
    /// Maximum duration of a single connection attempt
    pub connect_timeout: Duration,
    /// Idle period after which an open connection is considered dead
    pub read_timeout: Duration,
    /// Delay schedule between reconnect attempts
    pub backoff: BackoffPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: BINANCE_FUTURES_WS_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl FeedConfig {
    /// Create a new configuration with a custom base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Trade stream URL for one instrument, eg/ `wss://fstream.binance.com/ws/btcusdt@trade`.
    pub fn stream_url(&self, instrument: &str) -> Result<Url, DataError> {
        let invalid = |reason: String| DataError::InvalidUrl {
            instrument: SmolStr::new(instrument),
            reason,
        };

        if instrument.is_empty() || !instrument.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("instrument must be non-empty ASCII alphanumeric".to_string()));
        }

        let url = format!(
            "{}/{}@trade",
            self.base_url.trim_end_matches('/'),
            instrument.to_ascii_lowercase()
        );

        Url::parse(&url).map_err(|error| invalid(error.to_string()))
    }
}

/// Connection status of a single instrument stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
}

/// Message counters shared by every connection of a [`FeedClient`].
#[derive(Debug, Default)]
pub struct FeedStats {
    trades: AtomicU64,
    ignored: AtomicU64,
    rejected: AtomicU64,
    reconnects: AtomicU64,
}

/// Point-in-time copy of [`FeedStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStatsSnapshot {
    pub trades: u64,
    pub ignored: u64,
    pub rejected: u64,
    pub reconnects: u64,
}

impl FeedStats {
    pub fn snapshot(&self) -> FeedStatsSnapshot {
        FeedStatsSnapshot {
            trades: self.trades.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_trade(&self) {
        self.trades.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct InstrumentConnection {
    instrument: SmolStr,
    status_rx: watch::Receiver<ConnectionStatus>,
    handle: JoinHandle<()>,
}

/// Multi-instrument trade feed writing into a shared [`TickBuffer`].
///
/// Dropping a `FeedClient` signals every connection to shut down, but only
/// [`FeedClient::stop`] waits for them to finish.
#[derive(Debug)]
pub struct FeedClient {
    config: FeedConfig,
    buffer: TickBuffer,
    stats: Arc<FeedStats>,
    shutdown_tx: watch::Sender<bool>,
    connections: Vec<InstrumentConnection>,
}

impl FeedClient {
    pub fn new(config: FeedConfig, buffer: TickBuffer) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            buffer,
            stats: Arc::new(FeedStats::default()),
            shutdown_tx,
            connections: Vec::new(),
        }
    }

    /// Start one connection task per distinct instrument and return immediately.
    ///
    /// Instruments are normalised to ASCII uppercase, matching the symbols carried in trade
    /// events. Instruments that already have a running connection are skipped. Every URL is
    /// validated before any task is spawned, so on error nothing is started.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<Instruments, S>(&mut self, instruments: Instruments) -> Result<(), DataError>
    where
        Instruments: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested = instruments
            .into_iter()
            .map(|instrument| SmolStr::new(instrument.as_ref().trim().to_ascii_uppercase()))
            .collect::<BTreeSet<_>>();

        if requested.is_empty() {
            return Err(DataError::InstrumentsEmpty);
        }

        self.config.backoff.validate()?;

        let pending = requested
            .into_iter()
            .filter(|instrument| {
                !self
                    .connections
                    .iter()
                    .any(|connection| &connection.instrument == instrument)
            })
            .map(|instrument| {
                let url = self.config.stream_url(&instrument)?;
                Ok((instrument, url))
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        // A previous stop() leaves the shutdown flag raised
        self.shutdown_tx.send_replace(false);

        for (instrument, url) in pending {
            info!(%instrument, %url, "starting trade stream");

            let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
            let context = ConnectionContext {
                instrument: instrument.clone(),
                url,
                config: self.config.clone(),
                buffer: self.buffer.clone(),
                stats: Arc::clone(&self.stats),
                status_tx,
            };

            let handle = tokio::spawn(run_connection(context, self.shutdown_tx.subscribe()));

            self.connections.push(InstrumentConnection {
                instrument,
                status_rx,
                handle,
            });
        }

        Ok(())
    }

    /// Signal every connection to close and wait for the tasks to finish.
    ///
    /// Tasks still running once a shared grace period has elapsed are aborted. Ticks already in
    /// the [`TickBuffer`] are left for the consumer.
    pub async fn stop(&mut self) {
        self.shutdown_tx.send_replace(true);

        let connections = std::mem::take(&mut self.connections);
        let aborted = join_connections(connections, STOP_GRACE_PERIOD).await;

        info!(aborted, "FeedClient stopped");
    }

    /// Instruments with a started connection, in start order.
    pub fn instruments(&self) -> impl Iterator<Item = &SmolStr> {
        self.connections
            .iter()
            .map(|connection| &connection.instrument)
    }

    /// Latest [`ConnectionStatus`] of an instrument, if it was started.
    pub fn status(&self, instrument: &str) -> Option<ConnectionStatus> {
        self.connections
            .iter()
            .find(|connection| connection.instrument == instrument)
            .map(|connection| *connection.status_rx.borrow())
    }

    /// Subscribe to status transitions of an instrument, if it was started.
    pub fn subscribe_status(&self, instrument: &str) -> Option<watch::Receiver<ConnectionStatus>> {
        self.connections
            .iter()
            .find(|connection| connection.instrument == instrument)
            .map(|connection| connection.status_rx.clone())
    }

    pub fn stats(&self) -> FeedStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn buffer(&self) -> &TickBuffer {
        &self.buffer
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.connections
            .iter()
            .any(|connection| !connection.handle.is_finished())
    }
}

/// Wait for every connection task under one deadline, aborting the stragglers.
///
/// Returns the number of tasks aborted.
async fn join_connections(connections: Vec<InstrumentConnection>, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;
    let mut aborted = 0;

    for connection in connections {
        let InstrumentConnection {
            instrument,
            mut handle,
            ..
        } = connection;

        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                warn!(%instrument, %error, "trade stream task failed");
            }
            Err(_) => {
                warn!(%instrument, "trade stream did not stop in time, aborting");
                handle.abort();
                aborted += 1;
            }
        }
    }

    aborted
}

impl Drop for FeedClient {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}
