//! Frame decoding and outbound message types.
//!
//! Every inbound text frame is classified as exactly one of:
//! - control (keep-alive, acknowledgement, raw marker): never dispatched
//! - channel envelope `{channel, data}`: dispatched by the router
//! - decode error: reported and dropped
//!
//! Classification never affects liveness; the connection records every
//! frame before decoding it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Raw substrings the monitor sockets use as keep-alive/status markers.
///
/// Checked before JSON parsing, so they also catch non-JSON frames
/// such as a bare `Ping`.
pub const MONITOR_CONTROL_MARKERS: [&str; 5] =
    ["success", "Ping", "UpdateType", "error", "subscribe"];

// ============================================================================
// Inbound
// ============================================================================

/// Decoded `{channel, data}` unit dispatched to handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEnvelope {
    /// Logical channel name (exact match key for routing).
    pub channel: String,
    /// Channel payload, passed through untouched.
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl ChannelEnvelope {
    pub fn new(channel: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            channel: channel.into(),
            data,
            success: None,
        }
    }

    /// Deserialize `data` into a typed payload.
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.data)
    }
}

/// Kind of control frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    /// `{"channel":"ping","success":true}`.
    Ping,
    /// `{"success":true}` with no payload.
    Ack,
    /// Frame containing one of the connection's raw control markers.
    Marker(String),
}

/// Why a frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no channel")]
    MissingChannel,
}

/// Decoder output.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Control(ControlKind),
    Channel(ChannelEnvelope),
    Error(DecodeError),
}

impl Decoded {
    pub fn is_control(&self) -> bool {
        matches!(self, Self::Control(_))
    }

    pub fn envelope(&self) -> Option<&ChannelEnvelope> {
        match self {
            Self::Channel(env) => Some(env),
            _ => None,
        }
    }
}

/// Decoder counters.
#[derive(Debug, Default)]
pub struct DecoderStats {
    control: AtomicU64,
    envelopes: AtomicU64,
    errors: AtomicU64,
}

impl DecoderStats {
    pub fn control(&self) -> u64 {
        self.control.load(Ordering::Relaxed)
    }

    pub fn envelopes(&self) -> u64 {
        self.envelopes.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    fn record(&self, decoded: &Decoded) {
        let counter = match decoded {
            Decoded::Control(_) => &self.control,
            Decoded::Channel(_) => &self.envelopes,
            Decoded::Error(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Per-connection frame decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Raw substrings that mark a control frame.
    control_markers: Vec<String>,
    /// Channel assigned to frames that carry no `channel` field.
    default_channel: Option<String>,
    stats: DecoderStats,
}

impl FrameDecoder {
    /// Decoder for the main socket: strict JSON envelopes, no raw markers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder for a monitor socket.
    ///
    /// Frames containing any of `markers` are control frames. Object frames
    /// without a `channel` are delivered whole on `default_channel`.
    pub fn for_monitor<I, S>(markers: I, default_channel: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            control_markers: markers.into_iter().map(Into::into).collect(),
            default_channel: Some(default_channel.into()),
            stats: DecoderStats::default(),
        }
    }

    pub fn with_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.control_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_channel(mut self, channel: impl Into<String>) -> Self {
        self.default_channel = Some(channel.into());
        self
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Classify a raw text frame.
    pub fn decode(&self, raw: &str) -> Decoded {
        let decoded = self.classify(raw);
        self.stats.record(&decoded);
        decoded
    }

    fn classify(&self, raw: &str) -> Decoded {
        if raw.trim().is_empty() {
            return Decoded::Error(DecodeError::Empty);
        }

        if let Some(marker) = self.control_markers.iter().find(|m| raw.contains(m.as_str())) {
            return Decoded::Control(ControlKind::Marker(marker.clone()));
        }

        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => return Decoded::Error(DecodeError::InvalidJson(e.to_string())),
        };

        let serde_json::Value::Object(mut obj) = value else {
            return Decoded::Error(DecodeError::NotAnObject);
        };

        let success = obj.get("success").map(is_truthy);
        let channel = obj
            .get("channel")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        if channel.as_deref() == Some("ping") && success == Some(true) {
            return Decoded::Control(ControlKind::Ping);
        }

        if success == Some(true) && !obj.contains_key("data") {
            return Decoded::Control(ControlKind::Ack);
        }

        match (channel, &self.default_channel) {
            (Some(channel), _) => {
                let data = obj.remove("data").unwrap_or(serde_json::Value::Null);
                Decoded::Channel(ChannelEnvelope {
                    channel,
                    data,
                    success,
                })
            }
            (None, Some(default)) => Decoded::Channel(ChannelEnvelope {
                channel: default.clone(),
                data: serde_json::Value::Object(obj),
                success,
            }),
            (None, None) => Decoded::Error(DecodeError::MissingChannel),
        }
    }
}

/// JavaScript-style truthiness, which is what the backend's `success` flag follows.
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// Channel join sent on every open: `{"channel": <name>, "action": "join"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub channel: String,
    pub action: String,
}

impl JoinRequest {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            action: "join".to_string(),
        }
    }
}

/// Subscribe payload for monitor sockets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSubscribe {
    pub action: String,
    #[serde(rename = "licenseKey")]
    pub license_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usernames: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

impl MonitorSubscribe {
    pub fn new(license_key: impl Into<String>) -> Self {
        Self {
            action: "subscribe".to_string(),
            license_key: license_key.into(),
            usernames: None,
            groups: None,
        }
    }

    pub fn with_usernames(mut self, usernames: Vec<String>) -> Self {
        self.usernames = Some(usernames);
        self
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = Some(groups);
        self
    }
}
