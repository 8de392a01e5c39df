//! WebSocket connection manager.
//!
//! Owns the socket lifecycle for one status feed address: connect,
//! decode inbound frames into the status store, detect close/error, and
//! reconnect after a fixed delay until shut down.

use crate::error::{WsError, WsResult};
use crate::message::InboundMessage;
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use zbstat_feed::StatusSink;
use zbstat_telemetry::Metrics;

/// Wait between a connection loss and the next attempt.
/// Fixed: no backoff, no jitter, no retry cap.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Address of the local status server.
pub const DEFAULT_URL: &str = "ws://localhost:45456/ws";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Delay before reconnecting. Always [`RECONNECT_DELAY`] in the
    /// application; shortened only by test harnesses.
    pub reconnect_delay: Duration,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Check that the URL is a usable `ws://` or `wss://` address.
    pub fn validate(&self) -> WsResult<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(WsError::InvalidUrl(format!(
                "{}: scheme must be ws:// or wss://",
                self.url
            )));
        }
        self.url
            .as_str()
            .into_client_request()
            .map_err(|e| WsError::InvalidUrl(format!("{}: {e}", self.url)))?;
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Constructed, `start` not called yet.
    Idle,
    Connecting,
    Open,
    /// Socket gone, store marked disconnected.
    Closed,
    /// Reconnect timer armed.
    ReconnectPending,
    /// Terminal.
    Shutdown,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::ReconnectPending => "reconnect_pending",
            Self::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a socket went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// Close frame or end of stream.
    Closed,
    /// Connect failure or transport error.
    Error,
}

impl CloseReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Error => "error",
        }
    }
}

/// Connection statistics.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Reconnect timers armed so far.
    pub reconnect_count: u64,
    pub last_open: Option<DateTime<Utc>>,
    pub last_close: Option<DateTime<Utc>>,
}

/// WebSocket connection manager.
///
/// One instance per owner. `start` spawns the connection loop,
/// `shutdown` stops it for good. Dropping the manager shuts it down.
pub struct ConnectionManager {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// State shared with the connection loop task.
struct Inner {
    config: ConnectionConfig,
    sink: Arc<dyn StatusSink>,
    state: RwLock<ConnectionState>,
    stats: RwLock<ConnectionStats>,
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager writing into `sink`.
    pub fn new(config: ConnectionConfig, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                sink,
                state: RwLock::new(ConnectionState::Idle),
                stats: RwLock::new(ConnectionStats::default()),
                shutdown_token: CancellationToken::new(),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start the connection loop.
    ///
    /// Only valid once, from `Idle`.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime.
    pub fn start(&self) -> WsResult<()> {
        let mut task = self.task.lock();
        {
            let mut state = self.inner.state.write();
            match *state {
                ConnectionState::Idle => {}
                ConnectionState::Shutdown => return Err(WsError::Shutdown),
                _ => return Err(WsError::AlreadyStarted),
            }
            transition(&mut state, ConnectionState::Connecting);
        }

        info!(url = %self.inner.config.url, "Starting connection manager");
        *task = Some(tokio::spawn(self.inner.clone().run()));
        Ok(())
    }

    /// Stop the manager for good.
    ///
    /// Cancels a pending reconnect, closes the socket and marks the
    /// store disconnected. No store write happens after this returns.
    /// Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// Wait for the connection loop to exit after [`shutdown`](Self::shutdown).
    pub async fn wait(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(?e, "Connection loop task failed");
            }
        }
    }

    /// Get current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown_token.is_cancelled()
    }

    /// Get connection statistics.
    pub fn stats(&self) -> ConnectionStats {
        self.inner.stats.read().clone()
    }

    /// Get the configured URL.
    pub fn url(&self) -> &str {
        &self.inner.config.url
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl Inner {
    async fn run(self: Arc<Self>) {
        loop {
            if !self.begin_connecting() {
                break;
            }

            info!(url = %self.config.url, "Connecting to WebSocket");

            let reason = tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => break,

                result = connect_async_tls_with_config(&self.config.url, None, true, None) => {
                    match result {
                        Ok((ws_stream, _response)) => {
                            self.handle_open();
                            match self.listen(ws_stream).await {
                                Some(reason) => reason,
                                None => break,
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "WebSocket connection failed");
                            CloseReason::Error
                        }
                    }
                }
            };

            if !self.handle_close(reason) {
                break;
            }

            let delay = self.config.reconnect_delay;
            warn!(delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during reconnect delay");
                    break;
                }
            }
        }

        info!("Connection loop exited");
    }

    /// Read frames until the socket goes away.
    ///
    /// Returns `None` on shutdown.
    async fn listen(&self, ws_stream: WsStream) -> Option<CloseReason> {
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, closing socket");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(?e, "Failed to send Close frame during shutdown");
                    }
                    return None;
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                error!(?e, "Failed to send pong");
                                return Some(CloseReason::Error);
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1005, String::new()));
                            let closed = WsError::ConnectionClosed { code, reason };
                            warn!(%closed, "WebSocket closed by server");
                            return Some(CloseReason::Closed);
                        }
                        Some(Ok(Message::Binary(data))) => {
                            debug!(len = data.len(), "Ignoring binary frame");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            let e = WsError::from(e);
                            error!(error = %e, "WebSocket read error");
                            return Some(CloseReason::Error);
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Some(CloseReason::Closed);
                        }
                    }
                }
            }
        }
    }

    /// `→ Connecting` unless shut down.
    fn begin_connecting(&self) -> bool {
        let mut state = self.state.write();
        if *state == ConnectionState::Shutdown {
            return false;
        }
        transition(&mut state, ConnectionState::Connecting);
        true
    }

    fn handle_open(&self) {
        let mut state = self.state.write();
        if *state == ConnectionState::Shutdown {
            return;
        }
        transition(&mut state, ConnectionState::Open);
        self.sink.set_connected(true);
        self.stats.write().last_open = Some(Utc::now());
        Metrics::ws_connected();
        info!("WebSocket connected");
    }

    /// Decode one text frame and forward it to the store.
    ///
    /// Never fails: malformed frames are logged and dropped.
    fn handle_text(&self, text: &str) {
        // Read guard held across the store write so shutdown cannot interleave.
        let state = self.state.read();
        if *state != ConnectionState::Open {
            debug!(state = state.as_str(), "Dropping message outside of open state");
            return;
        }

        match InboundMessage::parse(text) {
            Ok(InboundMessage::Status(update)) => {
                if self
                    .sink
                    .apply_update(&update.game, update.curr, update.max)
                {
                    debug!(
                        game = %update.game,
                        curr = update.curr,
                        max = update.max,
                        "Status update applied"
                    );
                    Metrics::message_received("status");
                } else {
                    debug!(game = %update.game, "Ignoring update for untracked key");
                    Metrics::message_received("unknown_key");
                }
            }
            Ok(msg @ InboundMessage::Details(_)) => {
                debug!("Discarding details message");
                Metrics::message_received(msg.kind());
            }
            Err(e) => {
                warn!(error = %e, len = text.len(), "Failed to parse message");
                Metrics::message_received("malformed");
            }
        }
    }

    /// Mark the store disconnected and arm the reconnect timer.
    ///
    /// Returns `false` if shut down; nothing is armed then.
    fn handle_close(&self, reason: CloseReason) -> bool {
        let mut state = self.state.write();
        if *state == ConnectionState::Shutdown {
            return false;
        }
        transition(&mut state, ConnectionState::Closed);
        self.sink.set_connected(false);
        Metrics::ws_disconnected();

        {
            let mut stats = self.stats.write();
            stats.last_close = Some(Utc::now());
            stats.reconnect_count += 1;
        }
        Metrics::ws_reconnect(reason.as_str());

        transition(&mut state, ConnectionState::ReconnectPending);
        true
    }

    fn shutdown(&self) {
        let mut state = self.state.write();
        if *state == ConnectionState::Shutdown {
            return;
        }
        info!("ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
        transition(&mut state, ConnectionState::Shutdown);
        self.sink.set_connected(false);
        Metrics::ws_disconnected();
    }
}

fn transition(state: &mut ConnectionState, next: ConnectionState) {
    debug!(from = state.as_str(), to = next.as_str(), "Connection state transition");
    *state = next;
    Metrics::ws_state_set(next.as_str());
}
