//! All channel stores of one dashboard session.

use crate::error::{FeedError, FeedResult};
use crate::holdings::HoldingsStores;
use crate::store::{MessageLog, SnapshotStore};
use crate::tracker::TrackerStore;
use crate::transactions::TransactionBook;
use serde_json::Value;
use tradefeed_core::{Channel, FooterSummary, Notification, SniperStatus, SolanaPrice};

/// Capacities of the bounded logs.
#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    pub log_capacity: usize,
    pub tracker_capacity: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            log_capacity: 200,
            tracker_capacity: 500,
        }
    }
}

#[derive(Debug)]
pub struct ChannelStores {
    pub alerts: MessageLog<Value>,
    pub solana_price: SnapshotStore<SolanaPrice>,
    pub holdings: HoldingsStores,
    pub footer: SnapshotStore<FooterSummary>,
    pub sniper: SnapshotStore<SniperStatus>,
    pub wallet_balances: SnapshotStore<Value>,
    pub notifications: MessageLog<Notification>,
    pub tracker: TrackerStore,
    pub transactions: TransactionBook,
    pub twitter: MessageLog<Value>,
    pub truth_social: MessageLog<Value>,
    pub discord: MessageLog<Value>,
}

impl Default for ChannelStores {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

impl ChannelStores {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            alerts: MessageLog::new(limits.log_capacity),
            solana_price: SnapshotStore::new(),
            holdings: HoldingsStores::new(),
            footer: SnapshotStore::new(),
            sniper: SnapshotStore::new(),
            wallet_balances: SnapshotStore::new(),
            notifications: MessageLog::new(limits.log_capacity),
            tracker: TrackerStore::new(limits.tracker_capacity),
            transactions: TransactionBook::new(),
            twitter: MessageLog::new(limits.log_capacity),
            truth_social: MessageLog::new(limits.log_capacity),
            discord: MessageLog::new(limits.log_capacity),
        }
    }

    /// Log of a monitor channel.
    pub fn monitor_log(&self, channel: Channel) -> FeedResult<&MessageLog<Value>> {
        match channel {
            Channel::Twitter => Ok(&self.twitter),
            Channel::TruthSocial => Ok(&self.truth_social),
            Channel::Discord => Ok(&self.discord),
            other => Err(FeedError::NotAMonitor(other.to_string())),
        }
    }
}
