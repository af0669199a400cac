//! Router handlers that write decoded frames into the stores.
//!
//! The `tracker` channel is not bound here: its handler lives with the
//! suppression policy, which writes the tracker store itself.

use crate::error::{FeedError, FeedResult};
use crate::stores::ChannelStores;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use tradefeed_core::{
    Channel, FooterSummary, Notification, SharedPage, SniperStatus, SolanaPrice,
    TransactionUpdate,
};
use tradefeed_ws::{ChannelEnvelope, ChannelRouter, HandlerError, Registration};

impl From<FeedError> for HandlerError {
    fn from(e: FeedError) -> Self {
        HandlerError::new(e.to_string())
    }
}

/// Bind every main-socket store channel. Keep the returned registrations
/// alive for as long as the stores should receive frames.
pub fn bind_main(
    router: &ChannelRouter,
    stores: Arc<ChannelStores>,
    page: SharedPage,
) -> Vec<Registration> {
    let mut registrations = Vec::with_capacity(8);

    let s = stores.clone();
    registrations.push(router.register(Channel::Alerts.as_str(), move |env| {
        append_values(&s.alerts, &env.data);
        Ok(())
    }));

    let s = stores.clone();
    registrations.push(router.register(Channel::SolanaPrice.as_str(), move |env| {
        let price: SolanaPrice = env.parse()?;
        s.solana_price.replace(price);
        Ok(())
    }));

    // Destination depends on the page at dispatch time.
    let s = stores.clone();
    registrations.push(router.register(Channel::Holdings.as_str(), move |env| {
        let scope = page.holdings_scope();
        debug!(?scope, "Holdings snapshot");
        s.holdings.replace(&scope, env.data.clone());
        Ok(())
    }));

    let s = stores.clone();
    registrations.push(router.register(Channel::Footer.as_str(), move |env| {
        let footer: FooterSummary = env.parse()?;
        s.footer.replace(footer);
        Ok(())
    }));

    let s = stores.clone();
    registrations.push(router.register(Channel::Sniper.as_str(), move |env| {
        let sniper: SniperStatus = env.parse()?;
        s.sniper.replace(sniper);
        Ok(())
    }));

    let s = stores.clone();
    registrations.push(router.register(Channel::WalletBalances.as_str(), move |env| {
        s.wallet_balances.replace(env.data.clone());
        Ok(())
    }));

    let s = stores.clone();
    registrations.push(router.register(Channel::Notifications.as_str(), move |env| {
        let notification: Notification = env.parse()?;
        s.notifications.push(notification);
        Ok(())
    }));

    let s = stores;
    registrations.push(router.register(Channel::Transactions.as_str(), move |env| {
        apply_transactions(&s, env)?;
        Ok(())
    }));

    registrations
}

/// Bind a monitor socket's channel to its log.
pub fn bind_monitor(
    router: &ChannelRouter,
    channel: Channel,
    stores: Arc<ChannelStores>,
) -> FeedResult<Registration> {
    // Fail before registering anything.
    stores.monitor_log(channel)?;

    Ok(router.register(channel.as_str(), move |env| {
        let log = stores.monitor_log(channel)?;
        append_values(log, &env.data);
        Ok(())
    }))
}

/// Arrays are appended element by element, anything else as one entry.
fn append_values(log: &crate::store::MessageLog<Value>, data: &Value) {
    match data {
        Value::Array(items) => log.extend(items.iter().cloned()),
        other => log.push(other.clone()),
    }
}

fn apply_transactions(stores: &ChannelStores, env: &ChannelEnvelope) -> FeedResult<usize> {
    let updates: Vec<TransactionUpdate> = match &env.data {
        Value::Array(_) => serde_json::from_value(env.data.clone())?,
        Value::Object(_) => vec![serde_json::from_value(env.data.clone())?],
        other => {
            warn!(kind = value_kind(other), "Unexpected transactions payload");
            return Err(FeedError::InvalidData {
                channel: env.channel.clone(),
                reason: format!("expected object or array, got {}", value_kind(other)),
            });
        }
    };

    let count = updates.len();
    for update in updates {
        stores.transactions.upsert(update);
    }
    Ok(count)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
