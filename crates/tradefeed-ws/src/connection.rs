//! WebSocket connection manager.
//!
//! Owns one physical connection for a socket group: opens it through a
//! `Connector`, replays joins and subscribe frames on every open, decodes
//! and dispatches frames in arrival order, watches liveness, and
//! reconnects with capped exponential backoff.

use crate::error::{WsError, WsResult};
use crate::liveness::{LivenessMonitor, LivenessState};
use crate::message::{Decoded, FrameDecoder};
use crate::reporter::{ErrorReport, ErrorReporter};
use crate::router::ChannelRouter;
use crate::transport::{Connector, Inbound, Outbound, TungsteniteConnector};
use crate::ws_write_handle::{SendError, WsWriteHandle};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex as TokioMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Socket group name, used in logs and error reports.
    pub name: String,
    /// WebSocket URL.
    pub url: String,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// Upper bound of random jitter added to each backoff (0 = none).
    pub reconnect_jitter_ms: u64,
    /// Silence after which the connection is considered stale.
    pub liveness_timeout_ms: u64,
    /// Send a join frame for every registered channel on open.
    pub send_joins: bool,
    /// Extra frames sent on every open, after the joins.
    pub open_frames: Vec<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            url: String::new(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 2000,
            reconnect_jitter_ms: 0,
            liveness_timeout_ms: 4000,
            send_joins: true,
            open_frames: Vec::new(),
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Decides whether a closed connection may be reopened.
pub type ReconnectGate = Arc<dyn Fn() -> bool + Send + Sync>;

/// WebSocket connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    router: ChannelRouter,
    decoder: FrameDecoder,
    reporter: Arc<dyn ErrorReporter>,
    state: Arc<RwLock<ConnectionState>>,
    state_tx: watch::Sender<ConnectionState>,
    liveness: Arc<LivenessMonitor>,
    gate: ReconnectGate,
    /// Consecutive reconnect attempts since the last open.
    reconnect_count: Arc<RwLock<u32>>,
    /// Successful opens over the manager's lifetime.
    open_count: Arc<RwLock<u64>>,
    /// Outbound frame sender (for WsWriteHandle).
    outbound_tx: mpsc::Sender<Outbound>,
    /// Outbound frame receiver (consumed by the message loop).
    outbound_rx: Arc<TokioMutex<mpsc::Receiver<Outbound>>>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a manager using the tokio-tungstenite connector and the
    /// main-socket decoder. The router's reporter receives all faults.
    pub fn new(config: ConnectionConfig, router: ChannelRouter) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(100);
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        Self {
            liveness: Arc::new(LivenessMonitor::new(config.liveness_timeout_ms)),
            config,
            connector: Arc::new(TungsteniteConnector),
            reporter: router.reporter(),
            router,
            decoder: FrameDecoder::new(),
            state: Arc::new(RwLock::new(ConnectionState::Closed)),
            state_tx,
            gate: Arc::new(|| true),
            reconnect_count: Arc::new(RwLock::new(0)),
            open_count: Arc::new(RwLock::new(0)),
            outbound_tx,
            outbound_rx: Arc::new(TokioMutex::new(outbound_rx)),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_decoder(mut self, decoder: FrameDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Reconnects only happen while `gate` returns true.
    pub fn with_reconnect_gate<F>(mut self, gate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.gate = Arc::new(gate);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn router(&self) -> &ChannelRouter {
        &self.router
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    pub fn liveness(&self) -> &Arc<LivenessMonitor> {
        &self.liveness
    }

    /// Get a write handle for sending frames.
    ///
    /// The handle can be cloned and shared across tasks. Frames sent while
    /// the connection is not open are dropped.
    pub fn write_handle(&self) -> WsWriteHandle {
        WsWriteHandle::new(self.outbound_tx.clone(), self.state.clone())
    }

    /// Send a JSON payload on the live connection, if any.
    pub fn send<T: Serialize>(&self, payload: &T) -> Result<(), SendError> {
        self.write_handle().send(payload)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Watch connection state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    pub fn open_count(&self) -> u64 {
        *self.open_count.read()
    }

    /// Signal graceful shutdown.
    ///
    /// Cancels the shutdown token, which makes both the message loop and
    /// the reconnect loop exit promptly.
    pub fn shutdown(&self) {
        info!(socket = %self.config.name, "ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and run until shutdown, the reconnect gate closes, or the
    /// attempt limit is reached.
    pub async fn connect(&self) -> WsResult<()> {
        if self.config.url.is_empty() {
            return Err(WsError::PrerequisiteMissing(format!(
                "no url for socket {}",
                self.config.name
            )));
        }
        self.connect_with_retry().await
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        self.state_tx.send_replace(state);
    }

    async fn connect_with_retry(&self) -> WsResult<()> {
        let socket = self.config.name.as_str();

        loop {
            if self.is_shutdown() {
                info!(socket, "Shutdown requested, exiting connect loop");
                self.set_state(ConnectionState::Closed);
                return Ok(());
            }

            self.set_state(ConnectionState::Connecting);

            let reason = match self.try_connect().await {
                Ok(()) => {
                    info!(socket, "WebSocket connection closed");
                    "closed"
                }
                Err(WsError::StaleConnection { silent_ms }) => {
                    self.reporter.report(ErrorReport::Stale {
                        socket: socket.to_string(),
                        silent_ms,
                    });
                    "stale"
                }
                Err(e) => {
                    error!(socket, ?e, "WebSocket connection error");
                    self.reporter.report(ErrorReport::Transport {
                        socket: socket.to_string(),
                        error: e.to_string(),
                    });
                    "transport"
                }
            };

            let attempt = self.liveness.on_closed();
            self.set_state(ConnectionState::Closed);

            if self.is_shutdown() {
                info!(socket, "Shutdown requested after disconnect, not reconnecting");
                return Ok(());
            }

            if !(self.gate)() {
                info!(socket, "Reconnect gate closed, not reconnecting");
                return Ok(());
            }

            *self.reconnect_count.write() = attempt;

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(socket, attempt, "Max reconnection attempts reached");
                return Err(WsError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            let delay = self.calculate_backoff_delay(attempt);
            warn!(socket, attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
            self.liveness.on_reconnect_scheduled();
            self.reporter.report(ErrorReport::Reconnect {
                socket: socket.to_string(),
                attempt,
                reason,
            });

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!(socket, "Shutdown requested during backoff, exiting");
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self) -> WsResult<()> {
        let socket = self.config.name.as_str();
        info!(socket, url = %self.config.url, "Connecting to WebSocket");

        let transport = tokio::select! {
            result = self.connector.connect(&self.config.url) => result?,
            () = self.shutdown_token.cancelled() => return Ok(()),
        };
        let mut sink = transport.sink;
        let mut stream = transport.stream;

        // Anything buffered for the previous connection is stale.
        let mut outbound_rx = self.outbound_rx.lock().await;
        while outbound_rx.try_recv().is_ok() {}

        self.liveness.on_open();
        *self.reconnect_count.write() = 0;
        *self.open_count.write() += 1;
        self.set_state(ConnectionState::Open);
        info!(socket, "WebSocket connected");

        self.send_open_frames(&mut sink).await?;

        loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!(socket, "Shutdown signal received in message loop");
                    self.set_state(ConnectionState::Closing);
                    if let Err(e) = sink.send(Outbound::Close).await {
                        warn!(socket, ?e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(());
                }

                frame = stream.next() => {
                    match frame {
                        Some(Ok(inbound)) => {
                            self.liveness.record_frame();
                            match inbound {
                                Inbound::Text(text) => self.handle_text(&text),
                                Inbound::Ping(data) => {
                                    debug!(socket, "Received ping, sending pong");
                                    sink.send(Outbound::Pong(data)).await?;
                                }
                                Inbound::Pong => {
                                    debug!(socket, "Received pong");
                                }
                                Inbound::Close { code, reason } => {
                                    warn!(socket, code, %reason, "WebSocket closed by server");
                                    return Err(WsError::ConnectionClosed { code, reason });
                                }
                            }
                        }
                        Some(Err(e)) => {
                            error!(socket, ?e, "WebSocket read error");
                            return Err(e);
                        }
                        None => {
                            warn!(socket, "WebSocket stream ended");
                            return Ok(());
                        }
                    }
                }

                outbound = outbound_rx.recv() => {
                    if let Some(frame) = outbound {
                        sink.send(frame).await?;
                    }
                }

                () = tokio::time::sleep_until(self.liveness.deadline()) => {
                    if self.liveness.check() == LivenessState::Stale {
                        let silent_ms = self.liveness.silent_for().as_millis() as u64;
                        self.set_state(ConnectionState::Closing);
                        if let Err(e) = sink.send(Outbound::Close).await {
                            debug!(socket, ?e, "Close frame on stale connection failed");
                        }
                        return Err(WsError::StaleConnection { silent_ms });
                    }
                }
            }
        }
    }

    /// Joins for registered channels, then any configured subscribe frames.
    async fn send_open_frames(&self, sink: &mut crate::transport::FrameSink) -> WsResult<()> {
        let mut frames = Vec::new();
        if self.config.send_joins {
            frames.extend(self.router.join_frames()?);
        }
        frames.extend(self.config.open_frames.iter().cloned());

        info!(socket = %self.config.name, count = frames.len(), "Sending open frames");
        for frame in frames {
            sink.send(Outbound::Text(frame)).await?;
        }
        Ok(())
    }

    fn handle_text(&self, text: &str) {
        match self.decoder.decode(text) {
            Decoded::Channel(envelope) => {
                self.router.dispatch(&envelope);
            }
            Decoded::Control(kind) => {
                debug!(socket = %self.config.name, ?kind, "Control frame");
            }
            Decoded::Error(e) => {
                self.reporter.report(ErrorReport::Parse {
                    socket: self.config.name.clone(),
                    error: e.to_string(),
                    frame_len: text.len(),
                });
            }
        }
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;

        // base * 2^(attempt-1), capped
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent).min(max);

        Duration::from_millis(delay + rand_jitter(self.config.reconnect_jitter_ms))
    }
}

/// Random jitter in `0..bound` ms.
fn rand_jitter(bound: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    if bound == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % bound
}
