//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Not a monitor channel: {0}")]
    NotAMonitor(String),

    #[error("Invalid data on {channel}: {reason}")]
    InvalidData { channel: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
