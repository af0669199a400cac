//! Prometheus metrics and structured logging for tradefeed.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus metrics for sockets, frames, dispatch and alert side effects
//! - Text exposition via `gather_text`

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_FILTER};
pub use metrics::{gather_text, Metrics};
