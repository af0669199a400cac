//! Core domain types for the tradefeed dashboard feed.
//!
//! This crate provides the types shared by every other crate:
//! - `Channel`: logical channel names multiplexed over one socket
//! - `SolAmount`: trade size with display-precision normalization
//! - `WalletAddress`, `TrackedWallet`: wallet identities for the tracker
//! - Channel payloads (`TrackerEvent`, `Notification`, ...)
//! - `PageState`: the UI location/visibility facts the router reads

pub mod amount;
pub mod channel;
pub mod error;
pub mod page;
pub mod payloads;
pub mod wallet;

pub use amount::{SolAmount, DISPLAY_DECIMALS};
pub use channel::Channel;
pub use error::{CoreError, Result};
pub use page::{HoldingsScope, PageState, SharedPage};
pub use payloads::{
    FooterSummary, Notification, NotificationStatus, SniperStatus, SolanaPrice,
    TrackerEvent, TradeSide, TransactionUpdate,
};
pub use wallet::{TrackedWallet, WalletAddress};
