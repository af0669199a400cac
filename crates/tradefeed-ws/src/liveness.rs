//! Liveness monitoring for WebSocket connections.
//!
//! A connection is alive while frames keep arriving. Every inbound frame
//! (text, control, WebSocket ping/pong) resets the clock; a silence longer
//! than the timeout marks the connection stale and forces a reconnect.
//!
//! Uses `tokio::time::Instant` so the clock follows a paused test runtime.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Liveness state machine: `Idle -> Connected -> (Stale | Closed)`,
/// `Closed -> Idle` once a reconnect is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    Idle,
    Connected,
    Stale,
    Closed,
}

impl std::fmt::Display for LivenessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Connected => write!(f, "CONNECTED"),
            Self::Stale => write!(f, "STALE"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Liveness monitor for one socket group.
pub struct LivenessMonitor {
    /// Allowed silence before the connection is declared stale.
    timeout: Duration,
    state: RwLock<LivenessState>,
    /// Monotonic time of the last inbound frame.
    last_frame: RwLock<Instant>,
    /// Wall-clock time of the last inbound frame (for stats).
    last_frame_at: RwLock<Option<DateTime<Utc>>>,
    /// Consecutive reconnect attempts since the last successful open.
    attempts: RwLock<u32>,
}

impl LivenessMonitor {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            state: RwLock::new(LivenessState::Idle),
            last_frame: RwLock::new(Instant::now()),
            last_frame_at: RwLock::new(None),
            attempts: RwLock::new(0),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> LivenessState {
        *self.state.read()
    }

    pub fn attempts(&self) -> u32 {
        *self.attempts.read()
    }

    /// Connection opened: `Connected`, clock and attempt counter reset.
    pub fn on_open(&self) {
        *self.last_frame.write() = Instant::now();
        *self.attempts.write() = 0;
        *self.state.write() = LivenessState::Connected;
        debug!("Liveness: connected");
    }

    /// Record an inbound frame of any kind.
    pub fn record_frame(&self) {
        *self.last_frame.write() = Instant::now();
        *self.last_frame_at.write() = Some(Utc::now());
    }

    /// Time since the last inbound frame.
    pub fn silent_for(&self) -> Duration {
        self.last_frame.read().elapsed()
    }

    /// Evaluate the timeout. `Connected -> Stale` when the silence exceeds it.
    pub fn check(&self) -> LivenessState {
        let mut state = self.state.write();
        if *state == LivenessState::Connected && self.silent_for() > self.timeout {
            warn!(
                silent_ms = self.silent_for().as_millis() as u64,
                timeout_ms = self.timeout.as_millis() as u64,
                "Liveness: no frame within timeout"
            );
            *state = LivenessState::Stale;
        }
        *state
    }

    pub fn is_stale(&self) -> bool {
        self.state() == LivenessState::Stale
    }

    /// Instant after which `check` will report stale if nothing arrives.
    ///
    /// One millisecond past the timeout, since the transition requires the
    /// silence to strictly exceed it.
    pub fn deadline(&self) -> Instant {
        *self.last_frame.read() + self.timeout + Duration::from_millis(1)
    }

    /// Sleep until the current deadline.
    pub async fn wait_for_check(&self) {
        tokio::time::sleep_until(self.deadline()).await;
    }

    /// Connection closed (or failed to open). Returns the attempt number
    /// of the reconnect that will follow.
    pub fn on_closed(&self) -> u32 {
        *self.state.write() = LivenessState::Closed;
        let mut attempts = self.attempts.write();
        *attempts += 1;
        *attempts
    }

    /// Reconnect scheduled: `Closed -> Idle`.
    pub fn on_reconnect_scheduled(&self) {
        let mut state = self.state.write();
        if *state == LivenessState::Closed {
            *state = LivenessState::Idle;
        }
    }

    pub fn stats(&self) -> LivenessStats {
        LivenessStats {
            state: self.state(),
            last_frame_at: *self.last_frame_at.read(),
            silent_ms: self.silent_for().as_millis() as u64,
            attempts: self.attempts(),
        }
    }
}

/// Liveness statistics.
#[derive(Debug, Clone)]
pub struct LivenessStats {
    pub state: LivenessState,
    pub last_frame_at: Option<DateTime<Utc>>,
    pub silent_ms: u64,
    pub attempts: u32,
}
