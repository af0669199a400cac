//! Application configuration.
//!
//! Loaded from a TOML file, then secrets are overridden from the
//! environment (`TRADEFEED_AUTH_TOKEN`, `TRADEFEED_LICENSE_KEY`).

use crate::error::{AppError, AppResult};
use crate::monitors::MonitorKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tradefeed_alerts::{AlertSettings, MuteList, TradeFilter};
use tradefeed_core::{Channel, PageState, TrackedWallet};
use tradefeed_feed::StoreLimits;
use tradefeed_ws::ConnectionConfig;
use url::Url;

pub const ENV_PREFIX: &str = "TRADEFEED";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainSocketConfig {
    #[serde(default = "default_main_url")]
    pub url: String,
    /// Session token. Without it the main socket is not opened.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Channels to bind. Defaults to every main channel.
    #[serde(default = "default_main_channels")]
    pub channels: Vec<Channel>,
}

fn default_main_url() -> String {
    "wss://ws.tradefeed.local/ws".to_string()
}

fn default_main_channels() -> Vec<Channel> {
    Channel::MAIN.to_vec()
}

impl Default for MainSocketConfig {
    fn default() -> Self {
        Self {
            url: default_main_url(),
            auth_token: None,
            channels: default_main_channels(),
        }
    }
}

impl MainSocketConfig {
    /// URL with the auth token as a percent-encoded query parameter.
    /// `None` when no token is set.
    pub fn connect_url(&self) -> AppResult<Option<String>> {
        let Some(token) = self.auth_token.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let mut url = Url::parse(&self.url)?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(Some(url.into()))
    }
}

/// One monitor socket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Empty disables the monitor.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub usernames: Option<Vec<String>>,
    #[serde(default)]
    pub groups: Option<Vec<String>>,
}

/// Monitor sockets. A missing section disables that monitor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorsConfig {
    #[serde(default)]
    pub twitter: Option<MonitorConfig>,
    #[serde(default)]
    pub truth_social: Option<MonitorConfig>,
    #[serde(default)]
    pub discord: Option<MonitorConfig>,
}

impl MonitorsConfig {
    pub fn get(&self, kind: MonitorKind) -> Option<&MonitorConfig> {
        match kind {
            MonitorKind::Twitter => self.twitter.as_ref(),
            MonitorKind::TruthSocial => self.truth_social.as_ref(),
            MonitorKind::Discord => self.discord.as_ref(),
        }
    }
}

/// Reconnect and liveness timing shared by every socket group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default)]
    pub reconnect_jitter_ms: u64,
    /// 0 = infinite.
    #[serde(default)]
    pub max_reconnect_attempts: u32,
}

fn default_liveness_timeout_ms() -> u64 {
    4000
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    2000
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            liveness_timeout_ms: default_liveness_timeout_ms(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            reconnect_jitter_ms: 0,
            max_reconnect_attempts: 0,
        }
    }
}

impl SocketConfig {
    /// Connection config for a socket group; URL and frames set by the caller.
    pub fn connection(&self, name: &str, url: String) -> ConnectionConfig {
        ConnectionConfig {
            name: name.to_string(),
            url,
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_base_delay_ms: self.reconnect_base_delay_ms,
            reconnect_max_delay_ms: self.reconnect_max_delay_ms,
            reconnect_jitter_ms: self.reconnect_jitter_ms,
            liveness_timeout_ms: self.liveness_timeout_ms,
            send_joins: true,
            open_frames: Vec::new(),
        }
    }
}

/// Tracker alert defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default)]
    pub min_sol: Decimal,
    #[serde(default)]
    pub max_sol: Option<Decimal>,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_sound_asset")]
    pub sound_asset: String,
    /// `false` until the list is known, or an array of addresses.
    #[serde(default)]
    pub mute_list: MuteList,
    #[serde(default = "default_toast_limit")]
    pub toast_limit: usize,
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
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

fn default_toast_limit() -> usize {
    3
}

fn default_toast_duration_ms() -> u64 {
    3000
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            min_sol: Decimal::ZERO,
            max_sol: None,
            volume: default_volume(),
            sound_enabled: true,
            sound_asset: default_sound_asset(),
            mute_list: MuteList::Unloaded,
            toast_limit: default_toast_limit(),
            toast_duration_ms: default_toast_duration_ms(),
        }
    }
}

impl AlertsConfig {
    pub fn settings(&self) -> AppResult<AlertSettings> {
        let settings = AlertSettings {
            mute_list: self.mute_list.clone(),
            volume: self.volume,
            sound_enabled: self.sound_enabled,
            filter: TradeFilter::new(self.min_sol, self.max_sol)?,
            sound_asset: self.sound_asset.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default = "default_route")]
    pub initial_route: String,
}

fn default_route() -> String {
    "/".to_string()
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            initial_route: default_route(),
        }
    }
}

impl PageConfig {
    pub fn page_state(&self) -> PageState {
        PageState {
            route: self.initial_route.clone(),
            ..PageState::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoresConfig {
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default = "default_tracker_capacity")]
    pub tracker_capacity: usize,
}

fn default_log_capacity() -> usize {
    200
}

fn default_tracker_capacity() -> usize {
    500
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            tracker_capacity: default_tracker_capacity(),
        }
    }
}

impl From<&StoresConfig> for StoreLimits {
    fn from(cfg: &StoresConfig) -> Self {
        Self {
            log_capacity: cfg.log_capacity,
            tracker_capacity: cfg.tracker_capacity,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Interval of the status summary and metrics refresh.
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
}

fn default_log_filter() -> String {
    tradefeed_telemetry::DEFAULT_FILTER.to_string()
}

fn default_status_interval_secs() -> u64 {
    30
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            status_interval_secs: default_status_interval_secs(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub main: MainSocketConfig,
    #[serde(default)]
    pub monitors: MonitorsConfig,
    /// License for monitor sockets. Without it no monitor is opened.
    #[serde(default)]
    pub license_key: Option<String>,
    #[serde(default)]
    pub socket: SocketConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub stores: StoresConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub tracked_wallets: Vec<TrackedWallet>,
}

impl AppConfig {
    /// Load from `path` if it exists, defaults otherwise; then apply
    /// environment overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides(config::Environment::with_prefix(ENV_PREFIX))?;
        Ok(config)
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Override secrets from `env` (`<PREFIX>_AUTH_TOKEN`, `<PREFIX>_LICENSE_KEY`).
    pub fn apply_env_overrides(&mut self, env: config::Environment) -> AppResult<()> {
        let overrides = config::Config::builder()
            .add_source(env)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to read environment: {e}")))?;

        if let Ok(token) = overrides.get_string("auth_token") {
            self.main.auth_token = Some(token);
        }
        if let Ok(key) = overrides.get_string("license_key") {
            self.license_key = Some(key);
        }
        Ok(())
    }

    /// License key, if set and non-empty.
    pub fn license(&self) -> Option<&str> {
        self.license_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Monitors with a URL configured.
    pub fn enabled_monitors(&self) -> impl Iterator<Item = (MonitorKind, &MonitorConfig)> {
        MonitorKind::ALL.into_iter().filter_map(|kind| {
            self.monitors
                .get(kind)
                .filter(|cfg| !cfg.url.is_empty())
                .map(|cfg| (kind, cfg))
        })
    }
}
