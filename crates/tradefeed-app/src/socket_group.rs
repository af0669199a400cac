//! A running socket group.
//!
//! Owns the connection task, the state watcher and every handler
//! registration bound to the group's router. `shutdown()` or drop
//! releases all of them.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tradefeed_telemetry::Metrics;
use tradefeed_ws::{ConnectionManager, ConnectionState, Registration, WsError, WsResult};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Point-in-time view of a socket group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStatus {
    pub name: String,
    pub state: ConnectionState,
    pub reconnect_count: u32,
    pub open_count: u64,
    pub dispatched: u64,
    pub dropped: u64,
    pub handler_failures: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct FrameCounts {
    control: u64,
    envelopes: u64,
    errors: u64,
}

pub struct SocketGroup {
    manager: Arc<ConnectionManager>,
    task: Option<JoinHandle<WsResult<()>>>,
    watcher: Option<JoinHandle<()>>,
    registrations: Vec<Registration>,
    exported: Mutex<FrameCounts>,
}

impl SocketGroup {
    /// Spawn the connection task. `registrations` are the handlers already
    /// bound to the manager's router; the group keeps them alive.
    pub fn spawn(manager: ConnectionManager, mut registrations: Vec<Registration>) -> Self {
        let manager = Arc::new(manager);
        let name = manager.name().to_string();

        for channel in manager.router().registered_channels() {
            let label = channel.clone();
            registrations.push(manager.router().register(channel, move |_| {
                Metrics::dispatched(&label);
                Ok(())
            }));
        }

        let mut state_rx = manager.subscribe_state();
        let watched = name.clone();
        let watcher = tokio::spawn(async move {
            Metrics::ws_state_set(&watched, &state_rx.borrow().to_string());
            while state_rx.changed().await.is_ok() {
                let state = *state_rx.borrow_and_update();
                debug!(socket = %watched, %state, "Connection state changed");
                Metrics::ws_state_set(&watched, &state.to_string());
            }
        });

        let runner = manager.clone();
        let task = tokio::spawn(async move {
            let result = runner.connect().await;
            match &result {
                Ok(()) => info!(socket = %name, "Socket group stopped"),
                Err(WsError::PrerequisiteMissing(reason)) => {
                    debug!(socket = %name, %reason, "Socket group not started")
                }
                Err(e) => error!(socket = %name, error = %e, "Socket group failed"),
            }
            result
        });

        Self {
            manager,
            task: Some(task),
            watcher: Some(watcher),
            registrations,
            exported: Mutex::new(FrameCounts::default()),
        }
    }

    pub fn name(&self) -> &str {
        self.manager.name()
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn registrations(&self) -> usize {
        self.registrations.len()
    }

    /// Whether the connection task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    pub fn status(&self) -> GroupStatus {
        let stats = self.manager.router().stats();
        GroupStatus {
            name: self.name().to_string(),
            state: self.manager.state(),
            reconnect_count: self.manager.reconnect_count(),
            open_count: self.manager.open_count(),
            dispatched: stats.dispatched(),
            dropped: stats.dropped(),
            handler_failures: stats.handler_failures(),
        }
    }

    /// Push decoder counters into the frame metrics as deltas.
    pub fn export_metrics(&self) {
        let stats = self.manager.decoder().stats();
        let current = FrameCounts {
            control: stats.control(),
            envelopes: stats.envelopes(),
            errors: stats.errors(),
        };
        let mut exported = self.exported.lock();
        let socket = self.name();
        Metrics::frames(socket, "control", current.control.saturating_sub(exported.control));
        Metrics::frames(socket, "channel", current.envelopes.saturating_sub(exported.envelopes));
        Metrics::frames(socket, "error", current.errors.saturating_sub(exported.errors));
        *exported = current;
    }

    /// Close the connection, wait for the task, and unregister handlers.
    pub async fn shutdown(&mut self) {
        self.manager.shutdown();

        if let Some(task) = self.task.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(socket = %self.name(), error = %e, "Connection task panicked"),
                Err(_) => warn!(socket = %self.name(), "Connection task did not stop in time"),
            }
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        self.registrations.clear();
        info!(socket = %self.name(), "Socket group shut down");
    }
}

impl Drop for SocketGroup {
    fn drop(&mut self) {
        self.manager.shutdown();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}
