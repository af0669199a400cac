//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tradefeed_ws::WsError>),

    #[error("Feed error: {0}")]
    Feed(#[from] tradefeed_feed::FeedError),

    #[error("Alert settings error: {0}")]
    Alerts(#[from] tradefeed_alerts::AlertError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] tradefeed_telemetry::TelemetryError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tradefeed_ws::WsError> for AppError {
    fn from(e: tradefeed_ws::WsError) -> Self {
        Self::WebSocket(Box::new(e))
    }
}

pub type AppResult<T> = Result<T, AppError>;
