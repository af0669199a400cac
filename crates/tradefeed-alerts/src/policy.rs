//! Tracker side-effect policy.
//!
//! For each tracker element:
//! - always store the raw JSON (paused buffer while the panel is hovered),
//!   even when it does not parse as a trade
//! - play the alert sound if the trade passes the filter, the mute list
//!   is loaded without this wallet, volume is above zero and sound is on
//! - show a toast if the trade passes the filter, the tab is visible and
//!   the wallet is not muted

use crate::directory::WalletDirectory;
use crate::error::AlertResult;
use crate::limiter::ToastLimiter;
use crate::settings::SettingsSource;
use crate::sinks::{SoundPlayer, Toast, ToastKind};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};
use tradefeed_core::{Channel, SharedPage, TrackerEvent};
use tradefeed_feed::ChannelStores;
use tradefeed_telemetry::Metrics;
use tradefeed_ws::{ChannelRouter, HandlerError, Registration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredIn {
    Live,
    Paused,
}

/// What the policy did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyOutcome {
    pub stored: StoredIn,
    pub filter_passed: bool,
    pub sound_played: bool,
    pub toast_shown: bool,
}

impl PolicyOutcome {
    fn label(&self, muted: bool) -> &'static str {
        if !self.filter_passed {
            "filtered"
        } else if muted {
            "muted"
        } else if self.sound_played || self.toast_shown {
            "alerted"
        } else {
            "stored"
        }
    }
}

#[derive(Debug, Default)]
pub struct PolicyStats {
    events: AtomicU64,
    filtered: AtomicU64,
    sounds: AtomicU64,
    toasts: AtomicU64,
    unparsed: AtomicU64,
}

impl PolicyStats {
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    pub fn sounds(&self) -> u64 {
        self.sounds.load(Ordering::Relaxed)
    }

    pub fn toasts(&self) -> u64 {
        self.toasts.load(Ordering::Relaxed)
    }

    /// Stored elements that did not parse as tracker events.
    pub fn unparsed(&self) -> u64 {
        self.unparsed.load(Ordering::Relaxed)
    }
}

pub struct TrackerPolicy {
    settings: Arc<dyn SettingsSource>,
    sound: Arc<dyn SoundPlayer>,
    toasts: Arc<ToastLimiter>,
    directory: Arc<WalletDirectory>,
    stores: Arc<ChannelStores>,
    page: SharedPage,
    stats: PolicyStats,
}

impl TrackerPolicy {
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        sound: Arc<dyn SoundPlayer>,
        toasts: Arc<ToastLimiter>,
        directory: Arc<WalletDirectory>,
        stores: Arc<ChannelStores>,
        page: SharedPage,
    ) -> Self {
        Self {
            settings,
            sound,
            toasts,
            directory,
            stores,
            page,
            stats: PolicyStats::default(),
        }
    }

    pub fn stats(&self) -> &PolicyStats {
        &self.stats
    }

    /// Store one raw tracker element, then apply the sound and toast
    /// rules if it parses as a `TrackerEvent`.
    ///
    /// The store write happens first and regardless of the outcome; an
    /// element that does not parse is stored and returned as an error.
    pub fn handle(&self, raw: Value) -> AlertResult<PolicyOutcome> {
        let page = self.page.get();
        let stored = if page.tracker_hovered {
            StoredIn::Paused
        } else {
            StoredIn::Live
        };

        let parsed = serde_json::from_value::<TrackerEvent>(raw.clone());
        self.stores.tracker.push(raw, page.tracker_hovered);
        self.stats.events.fetch_add(1, Ordering::Relaxed);

        let event = match parsed {
            Ok(event) => event,
            Err(e) => {
                self.stats.unparsed.fetch_add(1, Ordering::Relaxed);
                Metrics::tracker_event("unparsed");
                return Err(e.into());
            }
        };

        let settings = self.settings.settings();
        let wallet = &event.wallet_address;

        let filter_passed = settings.filter.passes(&event.sol_amount);
        let muted = settings.mute_list.is_muted(wallet);
        let play_sound = filter_passed
            && settings.mute_list.sound_eligible(wallet)
            && settings.volume > 0.0
            && settings.sound_enabled;
        let toast = (filter_passed && page.tab_active && !muted).then(|| self.trade_toast(&event));

        trace!(
            wallet = %wallet,
            amount = %event.sol_amount,
            filter_passed,
            muted,
            "Tracker event"
        );

        if play_sound {
            self.sound.play(&settings.sound_asset, settings.volume);
            self.stats.sounds.fetch_add(1, Ordering::Relaxed);
            Metrics::sound_played();
        }

        let toast_shown = toast.is_some();
        if let Some(toast) = toast {
            self.toasts.show(toast);
            self.stats.toasts.fetch_add(1, Ordering::Relaxed);
        }

        if !filter_passed {
            self.stats.filtered.fetch_add(1, Ordering::Relaxed);
        }

        let outcome = PolicyOutcome {
            stored,
            filter_passed,
            sound_played: play_sound,
            toast_shown,
        };
        Metrics::tracker_event(outcome.label(muted));
        Ok(outcome)
    }

    fn trade_toast(&self, event: &TrackerEvent) -> Toast {
        let symbol = if event.symbol.is_empty() {
            event.mint.as_str()
        } else {
            event.symbol.as_str()
        };
        Toast {
            kind: ToastKind::Trade,
            title: self.directory.label_for(&event.wallet_address),
            body: format!(
                "{} {} SOL of {}",
                event.side,
                event.sol_amount.format_display(),
                symbol
            ),
            image: event.image.clone(),
        }
    }

    /// Bind the policy to the `tracker` channel.
    ///
    /// Frames carry one event or an array of them. Every element is
    /// stored; elements that fail to parse are reported once per frame.
    pub fn bind(self: &Arc<Self>, router: &ChannelRouter) -> Registration {
        let policy = Arc::clone(self);
        router.register(Channel::Tracker.as_str(), move |env| {
            let items = TrackerEvent::batch_items(&env.data);
            let total = items.len();
            let mut failed = 0;
            let mut first_error = None;

            for item in items {
                if let Err(e) = policy.handle(item.clone()) {
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
            debug!(events = total, failed, "Tracker frame");

            match first_error {
                Some(e) => Err(HandlerError::new(format!(
                    "{failed} of {total} tracker event(s) failed to parse: {e}"
                ))),
                None => Ok(()),
            }
        })
    }
}
