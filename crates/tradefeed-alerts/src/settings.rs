//! User alert settings and the accessor the policy reads them through.
//!
//! Settings are read on every event rather than captured when a handler
//! is registered, so a change takes effect on the next frame.

use crate::error::{AlertError, AlertResult};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tradefeed_core::{SolAmount, WalletAddress};

// ============================================================================
// Trade filter
// ============================================================================

/// Inclusive SOL range a trade must fall in to alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFilter {
    #[serde(default)]
    pub min: Decimal,
    #[serde(default)]
    pub max: Option<Decimal>,
}

impl Default for TradeFilter {
    fn default() -> Self {
        Self {
            min: Decimal::ZERO,
            max: None,
        }
    }
}

impl TradeFilter {
    pub fn new(min: Decimal, max: Option<Decimal>) -> AlertResult<Self> {
        let filter = Self { min, max };
        filter.validate()?;
        Ok(filter)
    }

    pub fn validate(&self) -> AlertResult<()> {
        match self.max {
            Some(max) if max < self.min => Err(AlertError::InvalidFilter { min: self.min, max }),
            _ => Ok(()),
        }
    }

    /// Compares the amount at display precision, so `0.999` passes a
    /// `min` of `1`.
    pub fn passes(&self, amount: &SolAmount) -> bool {
        let total = amount.normalized();
        total >= self.min && self.max.map_or(true, |max| total <= max)
    }
}

// ============================================================================
// Mute list
// ============================================================================

/// Wallets the user silenced.
///
/// Until the list has been fetched it is `Unloaded`: nothing counts as
/// muted, and nothing is eligible for sound either.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MuteList {
    #[default]
    Unloaded,
    Loaded(HashSet<WalletAddress>),
}

impl MuteList {
    pub fn loaded<I, A>(wallets: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<WalletAddress>,
    {
        Self::Loaded(wallets.into_iter().map(Into::into).collect())
    }

    /// Decode the stored shape: a boolean placeholder means not loaded,
    /// an array of addresses is the loaded list.
    pub fn from_legacy(value: &Value) -> AlertResult<Self> {
        match value {
            Value::Null | Value::Bool(_) => Ok(Self::Unloaded),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(WalletAddress::from).ok_or_else(|| {
                        AlertError::InvalidMuteList(format!("non-string entry {item}"))
                    })
                })
                .collect::<AlertResult<HashSet<_>>>()
                .map(Self::Loaded),
            other => Err(AlertError::InvalidMuteList(format!(
                "expected array or boolean, got {other}"
            ))),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Whether toasts for this wallet are suppressed.
    pub fn is_muted(&self, wallet: &WalletAddress) -> bool {
        match self {
            Self::Unloaded => false,
            Self::Loaded(set) => set.contains(wallet),
        }
    }

    /// Whether this wallet may play a sound: list loaded and wallet absent.
    pub fn sound_eligible(&self, wallet: &WalletAddress) -> bool {
        match self {
            Self::Unloaded => false,
            Self::Loaded(set) => !set.contains(wallet),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Unloaded => 0,
            Self::Loaded(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for MuteList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unloaded => serializer.serialize_bool(false),
            Self::Loaded(set) => {
                let mut wallets: Vec<&WalletAddress> = set.iter().collect();
                wallets.sort();
                wallets.serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for MuteList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_legacy(&value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSettings {
    #[serde(default)]
    pub mute_list: MuteList,
    /// 0.0 (silent) to 1.0.
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Global sound toggle.
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default)]
    pub filter: TradeFilter,
    #[serde(default = "default_sound_asset")]
    pub sound_asset: String,
}

fn default_volume() -> f32 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_sound_asset() -> String {
    "sounds/tracker-alert.mp3".to_string()
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            mute_list: MuteList::Unloaded,
            volume: default_volume(),
            sound_enabled: true,
            filter: TradeFilter::default(),
            sound_asset: default_sound_asset(),
        }
    }
}

impl AlertSettings {
    pub fn validate(&self) -> AlertResult<()> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(AlertError::InvalidVolume(self.volume));
        }
        self.filter.validate()
    }
}

/// Read access to the current settings.
pub trait SettingsSource: Send + Sync {
    fn settings(&self) -> Arc<AlertSettings>;
}

impl<F> SettingsSource for F
where
    F: Fn() -> Arc<AlertSettings> + Send + Sync,
{
    fn settings(&self) -> Arc<AlertSettings> {
        self()
    }
}

/// Settings shared between the UI (writer) and the policy (reader).
///
/// Writers swap in a new snapshot; readers never block each other.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<Arc<AlertSettings>>>,
}

impl SharedSettings {
    pub fn new(settings: AlertSettings) -> AlertResult<Self> {
        settings.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(Arc::new(settings))),
        })
    }

    /// Apply `f` to a copy of the settings and publish it if still valid.
    pub fn update(&self, f: impl FnOnce(&mut AlertSettings)) -> AlertResult<()> {
        let mut guard = self.inner.write();
        let mut next = AlertSettings::clone(&guard);
        f(&mut next);
        next.validate()?;
        *guard = Arc::new(next);
        Ok(())
    }

    pub fn set_mute_list(&self, mute_list: MuteList) -> AlertResult<()> {
        self.update(|s| s.mute_list = mute_list)
    }

    /// Add a wallet to the mute list, loading an empty list first if needed.
    pub fn mute(&self, wallet: WalletAddress) -> AlertResult<()> {
        self.update(|s| match &mut s.mute_list {
            MuteList::Loaded(set) => {
                set.insert(wallet);
            }
            MuteList::Unloaded => s.mute_list = MuteList::loaded([wallet]),
        })
    }

    pub fn unmute(&self, wallet: &WalletAddress) -> AlertResult<()> {
        self.update(|s| {
            if let MuteList::Loaded(set) = &mut s.mute_list {
                set.remove(wallet);
            }
        })
    }

    pub fn set_filter(&self, filter: TradeFilter) -> AlertResult<()> {
        self.update(|s| s.filter = filter)
    }

    pub fn set_volume(&self, volume: f32) -> AlertResult<()> {
        self.update(|s| s.volume = volume)
    }

    pub fn set_sound_enabled(&self, enabled: bool) -> AlertResult<()> {
        self.update(|s| s.sound_enabled = enabled)
    }
}

impl SettingsSource for SharedSettings {
    fn settings(&self) -> Arc<AlertSettings> {
        self.inner.read().clone()
    }
}
