//! Application wiring.
//!
//! Builds the stores, settings and policy once, then opens one socket
//! group for the main socket and one per configured monitor.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::monitors::MonitorKind;
use crate::reporter::MetricsReporter;
use crate::sinks::{LogSoundPlayer, LogToastSink};
use crate::socket_group::{GroupStatus, SocketGroup};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tradefeed_alerts::{
    bind_notification_toasts, SharedSettings, SoundPlayer, ToastLimiter, ToastSink, TrackerPolicy,
    WalletDirectory,
};
use tradefeed_core::{Channel, SharedPage};
use tradefeed_feed::{bind_main, bind_monitor, ChannelStores, StoreLimits};
use tradefeed_ws::{ChannelRouter, ConnectionManager, Connector, ErrorReporter};

/// Main application.
pub struct Application {
    config: AppConfig,
    stores: Arc<ChannelStores>,
    settings: SharedSettings,
    page: SharedPage,
    directory: Arc<WalletDirectory>,
    policy: Arc<TrackerPolicy>,
    toast_sink: Arc<dyn ToastSink>,
    reporter: Arc<dyn ErrorReporter>,
    connector: Option<Arc<dyn Connector>>,
    groups: Vec<SocketGroup>,
}

impl Application {
    /// Create an application that logs sounds and toasts.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Self::with_sinks(config, Arc::new(LogSoundPlayer), Arc::new(LogToastSink))
    }

    pub fn with_sinks(
        config: AppConfig,
        sound: Arc<dyn SoundPlayer>,
        toast_sink: Arc<dyn ToastSink>,
    ) -> AppResult<Self> {
        let stores = Arc::new(ChannelStores::new(StoreLimits::from(&config.stores)));
        let settings = SharedSettings::new(config.alerts.settings()?)?;
        let page = SharedPage::new(config.page.page_state());
        let directory = Arc::new(WalletDirectory::from_wallets(
            config.tracked_wallets.iter().cloned(),
        ));
        let limiter = Arc::new(ToastLimiter::new(
            toast_sink.clone(),
            config.alerts.toast_limit,
            config.alerts.toast_duration_ms,
        ));
        let policy = Arc::new(TrackerPolicy::new(
            Arc::new(settings.clone()),
            sound,
            limiter,
            directory.clone(),
            stores.clone(),
            page.clone(),
        ));

        info!(
            tracked_wallets = directory.len(),
            route = %config.page.initial_route,
            "Application initialized"
        );

        Ok(Self {
            config,
            stores,
            settings,
            page,
            directory,
            policy,
            toast_sink,
            reporter: Arc::new(MetricsReporter::default()),
            connector: None,
            groups: Vec::new(),
        })
    }

    /// Open sockets through `connector` instead of tokio-tungstenite.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stores(&self) -> &Arc<ChannelStores> {
        &self.stores
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn page(&self) -> &SharedPage {
        &self.page
    }

    pub fn directory(&self) -> &Arc<WalletDirectory> {
        &self.directory
    }

    pub fn policy(&self) -> &Arc<TrackerPolicy> {
        &self.policy
    }

    pub fn groups(&self) -> &[SocketGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&SocketGroup> {
        self.groups.iter().find(|g| g.name() == name)
    }

    pub fn status(&self) -> Vec<GroupStatus> {
        self.groups.iter().map(SocketGroup::status).collect()
    }

    /// Open every socket group whose prerequisites are met. A group
    /// without its token or license is skipped; nothing retries it.
    pub fn start(&mut self) -> AppResult<()> {
        if !self.groups.is_empty() {
            warn!("Socket groups already started");
            return Ok(());
        }

        match self.config.main.connect_url()? {
            Some(url) => {
                let group = self.start_main(url);
                self.groups.push(group);
            }
            None => debug!(socket = "main", "No auth token, main socket not opened"),
        }

        match self.config.license().map(str::to_string) {
            Some(license) => {
                let monitors: Vec<_> = self
                    .config
                    .enabled_monitors()
                    .map(|(kind, cfg)| (kind, cfg.clone()))
                    .collect();
                for (kind, cfg) in monitors {
                    let connection =
                        kind.connection_config(&self.config.socket, &cfg, &license)?;
                    let group = self.start_monitor(kind, connection)?;
                    self.groups.push(group);
                }
            }
            None => debug!("No license key, monitor sockets not opened"),
        }

        info!(groups = self.groups.len(), "Socket groups started");
        Ok(())
    }

    fn start_main(&self, url: String) -> SocketGroup {
        let router = ChannelRouter::with_reporter("main", self.reporter.clone());

        let mut registrations = bind_main(&router, self.stores.clone(), self.page.clone());
        registrations.push(self.policy.bind(&router));
        registrations.push(bind_notification_toasts(&router, self.toast_sink.clone()));

        for channel in Channel::MAIN {
            if !self.config.main.channels.contains(&channel) {
                router.set_enabled(channel.as_str(), false);
            }
        }

        let connection = self.config.socket.connection("main", url);
        let manager = self.manager(ConnectionManager::new(connection, router));
        SocketGroup::spawn(manager, registrations)
    }

    fn start_monitor(
        &self,
        kind: MonitorKind,
        connection: tradefeed_ws::ConnectionConfig,
    ) -> AppResult<SocketGroup> {
        let router = ChannelRouter::with_reporter(kind.name(), self.reporter.clone());
        let registration = bind_monitor(&router, kind.channel(), self.stores.clone())?;

        let manager =
            self.manager(ConnectionManager::new(connection, router).with_decoder(kind.decoder()));
        Ok(SocketGroup::spawn(manager, vec![registration]))
    }

    /// Apply the shared connector and the login-route reconnect gate.
    fn manager(&self, manager: ConnectionManager) -> ConnectionManager {
        let page = self.page.clone();
        let manager = manager.with_reconnect_gate(move || !page.is_login());
        match &self.connector {
            Some(connector) => manager.with_connector(connector.clone()),
            None => manager,
        }
    }

    /// Log group status and refresh frame metrics.
    pub fn report_status(&self) {
        for group in &self.groups {
            group.export_metrics();
            let status = group.status();
            info!(
                socket = %status.name,
                state = %status.state,
                reconnects = status.reconnect_count,
                opens = status.open_count,
                dispatched = status.dispatched,
                dropped = status.dropped,
                handler_failures = status.handler_failures,
                "Socket status"
            );
        }
        let stats = self.policy.stats();
        info!(
            events = stats.events(),
            filtered = stats.filtered(),
            sounds = stats.sounds(),
            toasts = stats.toasts(),
            "Tracker status"
        );
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Start the socket groups and run until `signal` completes.
    pub async fn run_until<F>(mut self, signal: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start()?;
        if self.groups.is_empty() {
            warn!("No socket group could be opened");
        }

        let period = Duration::from_secs(self.config.telemetry.status_interval_secs.max(1));
        let mut status_interval = tokio::time::interval(period);
        status_interval.tick().await;
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = status_interval.tick() => {
                    self.report_status();
                }

                () = &mut signal => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Close every socket group and release its handlers.
    pub async fn shutdown(&mut self) {
        for group in &mut self.groups {
            group.shutdown().await;
        }
        self.report_status();
        self.groups.clear();
        info!("Application shutdown complete");
    }
}
