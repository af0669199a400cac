//! Channel payloads.
//!
//! The decoder passes `data` through untouched; these types are what the
//! stores and the tracker policy deserialize it into. Fields the backend
//! may omit are optional so one missing field never drops a frame.

use crate::amount::SolAmount;
use crate::wallet::WalletAddress;
use serde::{Deserialize, Serialize};

// ============================================================================
// Main socket payloads
// ============================================================================

/// `solanaPrice` channel: SOL/USD price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolanaPrice {
    pub price: f64,
}

/// Sniper summary inside the footer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SniperStatus {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub is_running: bool,
}

/// `footer` channel: counters shown in the status bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterSummary {
    #[serde(default)]
    pub wallet_tracker: serde_json::Value,
    #[serde(default)]
    pub twitter: serde_json::Value,
    #[serde(default)]
    pub alerts: serde_json::Value,
    #[serde(default)]
    pub sniper: SniperStatus,
}

/// Status of a `notifications` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Success,
    Failed,
    Error,
}

impl NotificationStatus {
    /// Failed and error notifications are user-visible failures.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

/// `notifications` channel: domain-level results (e.g. a buy landed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub status: NotificationStatus,
    #[serde(default)]
    pub message: String,
}

/// `transactions` channel: balance change for one wallet/mint pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub mint: String,
    pub wallet: WalletAddress,
    #[serde(default)]
    pub balance: f64,
    #[serde(rename = "balanceStr", default)]
    pub balance_str: Option<String>,
}

// ============================================================================
// Tracker events
// ============================================================================

/// Trade direction of a tracked-wallet event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    #[serde(alias = "Buy", alias = "BUY")]
    Buy,
    #[serde(alias = "Sell", alias = "SELL")]
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// `tracker` channel: a trade by a tracked wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerEvent {
    #[serde(rename = "walletAddress")]
    pub wallet_address: WalletAddress,
    #[serde(rename = "solAmount")]
    pub sol_amount: SolAmount,
    pub mint: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Fields this client does not interpret, kept for the UI.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TrackerEvent {
    /// Elements of a tracker frame's `data`: each item of an array, or the
    /// value itself for anything else.
    pub fn batch_items(data: &serde_json::Value) -> Vec<&serde_json::Value> {
        match data {
            serde_json::Value::Array(items) => items.iter().collect(),
            other => vec![other],
        }
    }
}
