//! Error reporting collaborator.
//!
//! Socket, parse and handler faults are recovered where they happen and
//! handed to an `ErrorReporter` with enough context to diagnose them.
//! Nothing reported here ever interrupts delivery on other channels.

use tracing::{debug, error, warn};

/// A recovered fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReport {
    /// Frame could not be decoded and was dropped.
    Parse {
        socket: String,
        error: String,
        frame_len: usize,
    },
    /// A channel handler returned an error or panicked.
    Handler {
        socket: String,
        channel: String,
        error: String,
    },
    /// Socket error event. Does not by itself close the connection.
    Transport { socket: String, error: String },
    /// Liveness timeout forced a reconnect.
    Stale { socket: String, silent_ms: u64 },
    /// A reconnect was scheduled after the connection closed. `reason` is
    /// `stale`, `transport` or `closed`.
    Reconnect {
        socket: String,
        attempt: u32,
        reason: &'static str,
    },
}

impl ErrorReport {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse",
            Self::Handler { .. } => "handler",
            Self::Transport { .. } => "transport",
            Self::Stale { .. } => "stale",
            Self::Reconnect { .. } => "reconnect",
        }
    }

    pub fn socket(&self) -> &str {
        match self {
            Self::Parse { socket, .. }
            | Self::Handler { socket, .. }
            | Self::Transport { socket, .. }
            | Self::Stale { socket, .. }
            | Self::Reconnect { socket, .. } => socket,
        }
    }
}

/// Sink for recovered faults.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, report: ErrorReport);
}

/// Reporter that writes to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, report: ErrorReport) {
        match report {
            ErrorReport::Parse {
                socket,
                error,
                frame_len,
            } => warn!(%socket, %error, frame_len, "Dropped undecodable frame"),
            ErrorReport::Handler {
                socket,
                channel,
                error,
            } => error!(%socket, %channel, %error, "Channel handler failed"),
            ErrorReport::Transport { socket, error } => {
                warn!(%socket, %error, "WebSocket transport error")
            }
            ErrorReport::Stale { socket, silent_ms } => {
                warn!(%socket, silent_ms, "WebSocket connection stale")
            }
            ErrorReport::Reconnect {
                socket,
                attempt,
                reason,
            } => debug!(%socket, attempt, reason, "Reconnect scheduled"),
        }
    }
}

impl<F> ErrorReporter for F
where
    F: Fn(ErrorReport) + Send + Sync,
{
    fn report(&self, report: ErrorReport) {
        self(report)
    }
}
