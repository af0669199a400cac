//! Headless tradefeed client.
//!
//! Wires configuration, stores, the tracker policy and one socket group
//! per configured WebSocket into a single `Application`.

pub mod app;
pub mod config;
pub mod error;
pub mod monitors;
pub mod reporter;
pub mod sinks;
pub mod socket_group;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use monitors::MonitorKind;
pub use reporter::MetricsReporter;
pub use socket_group::{GroupStatus, SocketGroup};
