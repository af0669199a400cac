//! Trade-size amounts.
//!
//! Uses `rust_decimal` so the value the tracker filter compares is exactly
//! the value the dashboard displays. Amounts arrive as JSON numbers or
//! strings depending on the producer.

use crate::error::{CoreError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal places shown for SOL amounts.
pub const DISPLAY_DECIMALS: u32 = 2;

/// SOL amount with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SolAmount(pub Decimal);

impl SolAmount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    /// Format for display: rounded half away from zero, fixed two decimals.
    pub fn format_display(&self) -> String {
        let mut rounded = self
            .0
            .round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(DISPLAY_DECIMALS);
        rounded.to_string()
    }

    /// Round-trip through `format_display` and parse the result back.
    ///
    /// Filters compare against this value so that a trade shown as "1.00"
    /// is treated as exactly 1.
    pub fn normalized(&self) -> Decimal {
        let shown = self.format_display();
        // format_display always yields a plain decimal literal
        Decimal::from_str(&shown).unwrap_or(self.0)
    }

    /// Parse from a JSON value (number or numeric string).
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Number(n) => parse_decimal(&n.to_string()).map(Self),
            serde_json::Value::String(s) => parse_decimal(s.trim()).map(Self),
            other => Err(CoreError::InvalidAmount(format!(
                "expected number or string, got {other}"
            ))),
        }
    }
}

fn parse_decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| CoreError::InvalidAmount(format!("{raw}: {e}")))
}

impl fmt::Display for SolAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SolAmount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        parse_decimal(s.trim()).map(Self)
    }
}

impl From<Decimal> for SolAmount {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl<'de> Deserialize<'de> for SolAmount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}
