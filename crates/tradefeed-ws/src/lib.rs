//! Multiplexed WebSocket client for the tradefeed dashboard.
//!
//! One physical connection per socket group carries many logical channels:
//! - Frame decoding into channel envelopes and control frames
//! - Channel routing with scoped handler registration
//! - Liveness monitoring (silence timeout, pings count as traffic)
//! - Reconnection with backoff, gated on the current page
//! - Join/subscribe frames replayed on every open

pub mod connection;
pub mod error;
pub mod liveness;
pub mod message;
pub mod reporter;
pub mod router;
pub mod transport;
pub mod ws_write_handle;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState, ReconnectGate};
pub use error::{WsError, WsResult};
pub use liveness::{LivenessMonitor, LivenessState, LivenessStats};
pub use message::{
    ChannelEnvelope, ControlKind, DecodeError, Decoded, DecoderStats, FrameDecoder, JoinRequest,
    MonitorSubscribe, MONITOR_CONTROL_MARKERS,
};
pub use reporter::{ErrorReport, ErrorReporter, TracingReporter};
pub use router::{ChannelRouter, HandlerError, HandlerResult, Registration, RouterStats};
pub use transport::{Connector, Inbound, Outbound, Transport, TungsteniteConnector};
pub use ws_write_handle::{SendError, WsWriteHandle};
