//! Monitor socket groups (twitter, truth_social, discord).
//!
//! Same connection machinery as the main socket, but a monitor sends one
//! subscribe frame instead of channel joins, classifies some frames as
//! control by raw substring, and treats channel-less objects as data of
//! its own channel.

use crate::config::{MonitorConfig, SocketConfig};
use crate::error::AppResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use tradefeed_core::Channel;
use tradefeed_ws::{ConnectionConfig, FrameDecoder, MonitorSubscribe, MONITOR_CONTROL_MARKERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    Twitter,
    TruthSocial,
    Discord,
}

impl MonitorKind {
    pub const ALL: [MonitorKind; 3] = [Self::Twitter, Self::TruthSocial, Self::Discord];

    /// Socket group name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::TruthSocial => "truth_social",
            Self::Discord => "discord",
        }
    }

    /// The one channel this monitor delivers.
    pub fn channel(&self) -> Channel {
        match self {
            Self::Twitter => Channel::Twitter,
            Self::TruthSocial => Channel::TruthSocial,
            Self::Discord => Channel::Discord,
        }
    }

    pub fn decoder(&self) -> FrameDecoder {
        FrameDecoder::for_monitor(MONITOR_CONTROL_MARKERS, self.channel().as_str())
    }

    pub fn subscribe(&self, license_key: &str, cfg: &MonitorConfig) -> MonitorSubscribe {
        let mut subscribe = MonitorSubscribe::new(license_key);
        if let Some(usernames) = &cfg.usernames {
            subscribe = subscribe.with_usernames(usernames.clone());
        }
        if let Some(groups) = &cfg.groups {
            subscribe = subscribe.with_groups(groups.clone());
        }
        subscribe
    }

    /// Connection config that subscribes instead of joining.
    pub fn connection_config(
        &self,
        socket: &SocketConfig,
        cfg: &MonitorConfig,
        license_key: &str,
    ) -> AppResult<ConnectionConfig> {
        let frame = serde_json::to_string(&self.subscribe(license_key, cfg))?;
        let mut connection = socket.connection(self.name(), cfg.url.clone());
        connection.send_joins = false;
        connection.open_frames = vec![frame];
        Ok(connection)
    }
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
