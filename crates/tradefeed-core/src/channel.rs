//! Logical channel names.
//!
//! The wire format uses plain strings; `Channel` names the ones this
//! client knows about. The router itself matches on exact strings, so an
//! unknown channel is simply never registered.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known logical channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "alerts")]
    Alerts,
    #[serde(rename = "solanaPrice")]
    SolanaPrice,
    #[serde(rename = "holdings")]
    Holdings,
    #[serde(rename = "footer")]
    Footer,
    #[serde(rename = "sniper")]
    Sniper,
    #[serde(rename = "walletBalances")]
    WalletBalances,
    #[serde(rename = "notifications")]
    Notifications,
    #[serde(rename = "tracker")]
    Tracker,
    #[serde(rename = "transactions")]
    Transactions,
    #[serde(rename = "twitter")]
    Twitter,
    #[serde(rename = "truthSocial")]
    TruthSocial,
    #[serde(rename = "discord")]
    Discord,
}

impl Channel {
    /// Channels joined on the main socket.
    pub const MAIN: [Channel; 9] = [
        Channel::Alerts,
        Channel::SolanaPrice,
        Channel::Holdings,
        Channel::Footer,
        Channel::Sniper,
        Channel::WalletBalances,
        Channel::Notifications,
        Channel::Tracker,
        Channel::Transactions,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alerts => "alerts",
            Self::SolanaPrice => "solanaPrice",
            Self::Holdings => "holdings",
            Self::Footer => "footer",
            Self::Sniper => "sniper",
            Self::WalletBalances => "walletBalances",
            Self::Notifications => "notifications",
            Self::Tracker => "tracker",
            Self::Transactions => "transactions",
            Self::Twitter => "twitter",
            Self::TruthSocial => "truthSocial",
            Self::Discord => "discord",
        }
    }

    /// Monitor channels are fed by their own sockets, not by joins.
    pub fn is_monitor(&self) -> bool {
        matches!(self, Self::Twitter | Self::TruthSocial | Self::Discord)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alerts" => Ok(Self::Alerts),
            "solanaPrice" => Ok(Self::SolanaPrice),
            "holdings" => Ok(Self::Holdings),
            "footer" => Ok(Self::Footer),
            "sniper" => Ok(Self::Sniper),
            "walletBalances" => Ok(Self::WalletBalances),
            "notifications" => Ok(Self::Notifications),
            "tracker" => Ok(Self::Tracker),
            "transactions" => Ok(Self::Transactions),
            "twitter" => Ok(Self::Twitter),
            "truthSocial" => Ok(Self::TruthSocial),
            "discord" => Ok(Self::Discord),
            other => Err(CoreError::UnknownChannel(other.to_string())),
        }
    }
}
