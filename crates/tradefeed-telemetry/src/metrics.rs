//! Prometheus metrics for tradefeed.
//!
//! Covers socket state, inbound frames, reconnects, recovered errors,
//! channel dispatch and tracker side effects.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration
//! failure (e.g. duplicate metric names) is a fatal configuration error
//! and only happens during static initialization.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_int_counter, register_int_counter_vec,
    CounterVec, Encoder, GaugeVec, IntCounter, IntCounterVec, TextEncoder,
};

/// Socket connection state (1 = open).
/// Labels: socket
pub static WS_CONNECTED: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "tradefeed_ws_connected",
        "WebSocket connection state (1=open)",
        &["socket"]
    )
    .unwrap()
});

/// Socket state machine current state.
/// Labels: socket, state (connecting/open/closing/closed)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "tradefeed_ws_state",
        "WebSocket state machine current state (1=active, 0=inactive)",
        &["socket", "state"]
    )
    .unwrap()
});

/// Inbound frames by decode outcome.
/// Labels: socket, kind (envelope/control/error)
pub static FRAMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tradefeed_frames_total",
        "Inbound frames by decode outcome",
        &["socket", "kind"]
    )
    .unwrap()
});

/// Reconnects by cause.
pub static RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tradefeed_reconnect_total",
        "Total WebSocket reconnections",
        &["socket", "reason"]
    )
    .unwrap()
});

/// Recovered errors by kind (parse/handler/transport/stale).
pub static ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tradefeed_errors_total",
        "Recovered errors by kind",
        &["kind"]
    )
    .unwrap()
});

/// Envelopes delivered per channel.
pub static DISPATCH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tradefeed_dispatch_total",
        "Envelopes dispatched per channel",
        &["channel"]
    )
    .unwrap()
});

/// Toasts shown.
/// Labels: kind (trade/info/success/error)
pub static TOASTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("tradefeed_toasts_total", "Toasts shown", &["kind"]).unwrap()
});

/// Alert sounds played.
pub static SOUNDS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("tradefeed_sounds_total", "Alert sounds played").unwrap()
});

/// Tracker events by policy outcome.
/// Labels: outcome (filtered/muted/alerted/stored/unparsed)
pub static TRACKER_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "tradefeed_tracker_events_total",
        "Tracker events by policy outcome",
        &["outcome"]
    )
    .unwrap()
});

const WS_STATES: [&str; 4] = ["connecting", "open", "closing", "closed"];

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Set the socket's state; only the active state is 1.
    pub fn ws_state_set(socket: &str, state: &str) {
        for s in WS_STATES {
            WS_STATE.with_label_values(&[socket, s]).set(0.0);
        }
        WS_STATE.with_label_values(&[socket, state]).set(1.0);
        WS_CONNECTED
            .with_label_values(&[socket])
            .set(if state == "open" { 1.0 } else { 0.0 });
    }

    pub fn ws_reconnect(socket: &str, reason: &str) {
        RECONNECT_TOTAL.with_label_values(&[socket, reason]).inc();
    }

    /// Add `count` frames of `kind`. Counters read from decoder stats are
    /// reported as deltas.
    pub fn frames(socket: &str, kind: &str, count: u64) {
        if count > 0 {
            FRAMES_TOTAL.with_label_values(&[socket, kind]).inc_by(count);
        }
    }

    pub fn error(kind: &str) {
        ERRORS_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn dispatched(channel: &str) {
        DISPATCH_TOTAL.with_label_values(&[channel]).inc();
    }

    pub fn toast_shown(kind: &str) {
        TOASTS_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn sound_played() {
        SOUNDS_TOTAL.inc();
    }

    pub fn tracker_event(outcome: &str) {
        TRACKER_EVENTS_TOTAL.with_label_values(&[outcome]).inc();
    }
}

/// Encode every registered metric in the Prometheus text format.
pub fn gather_text() -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_set_is_exclusive() {
        Metrics::ws_state_set("test_socket", "open");
        Metrics::ws_state_set("test_socket", "closed");

        assert_eq!(WS_STATE.with_label_values(&["test_socket", "open"]).get(), 0.0);
        assert_eq!(WS_STATE.with_label_values(&["test_socket", "closed"]).get(), 1.0);
        assert_eq!(WS_CONNECTED.with_label_values(&["test_socket"]).get(), 0.0);
    }

    #[test]
    fn test_gather_text_contains_registered_metrics() {
        Metrics::sound_played();
        Metrics::dispatched("solanaPrice");

        let text = gather_text().unwrap();
        assert!(text.contains("tradefeed_sounds_total"));
        assert!(text.contains("tradefeed_dispatch_total{channel=\"solanaPrice\"}"));
    }
}
