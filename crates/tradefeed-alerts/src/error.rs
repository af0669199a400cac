//! Alert error types.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Invalid filter: min {min} is greater than max {max}")]
    InvalidFilter { min: Decimal, max: Decimal },

    #[error("Invalid volume {0}: expected 0.0..=1.0")]
    InvalidVolume(f32),

    #[error("Invalid mute list: {0}")]
    InvalidMuteList(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AlertResult<T> = Result<T, AlertError>;
