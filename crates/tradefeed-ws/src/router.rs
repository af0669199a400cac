//! Channel routing.
//!
//! Dispatches decoded envelopes to handlers by exact channel name.
//! Registration is scoped: `register` returns a `Registration` that
//! unregisters the handler when disposed or dropped, so a torn-down
//! consumer can never receive another frame.
//!
//! Handlers run synchronously on the connection task, in registration
//! order, so frames on one connection are handled strictly in arrival order.

use crate::error::WsResult;
use crate::message::{ChannelEnvelope, JoinRequest};
use crate::reporter::{ErrorReport, ErrorReporter, TracingReporter};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::{debug, info};

/// Error returned by a channel handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self(format!("payload: {e}"))
    }
}

pub type HandlerResult = Result<(), HandlerError>;

type Handler = Arc<dyn Fn(&ChannelEnvelope) -> HandlerResult + Send + Sync>;

struct HandlerEntry {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct Routes {
    /// Channels in first-registration order (join order).
    order: Vec<String>,
    handlers: HashMap<String, Vec<HandlerEntry>>,
    disabled: HashSet<String>,
}

/// Router counters.
#[derive(Debug, Default)]
pub struct RouterStats {
    dispatched: AtomicU64,
    dropped: AtomicU64,
    handler_failures: AtomicU64,
}

impl RouterStats {
    /// Envelopes delivered to at least one handler.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Envelopes with no enabled handler.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }
}

struct RouterInner {
    socket: String,
    routes: RwLock<Routes>,
    next_id: AtomicU64,
    reporter: Arc<dyn ErrorReporter>,
    stats: RouterStats,
}

impl RouterInner {
    fn unregister(&self, channel: &str, id: u64) {
        let mut routes = self.routes.write();
        let now_empty = match routes.handlers.get_mut(channel) {
            Some(entries) => {
                entries.retain(|e| e.id != id);
                entries.is_empty()
            }
            None => return,
        };
        if now_empty {
            routes.handlers.remove(channel);
            routes.order.retain(|c| c != channel);
        }
        debug!(socket = %self.socket, %channel, id, "Handler unregistered");
    }
}

/// Channel router for one socket group.
#[derive(Clone)]
pub struct ChannelRouter {
    inner: Arc<RouterInner>,
}

impl ChannelRouter {
    /// Create a router that reports faults through `tracing`.
    pub fn new(socket: impl Into<String>) -> Self {
        Self::with_reporter(socket, Arc::new(TracingReporter))
    }

    pub fn with_reporter(socket: impl Into<String>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                socket: socket.into(),
                routes: RwLock::new(Routes::default()),
                next_id: AtomicU64::new(1),
                reporter,
                stats: RouterStats::default(),
            }),
        }
    }

    /// Socket group this router serves.
    pub fn socket(&self) -> &str {
        &self.inner.socket
    }

    pub fn reporter(&self) -> Arc<dyn ErrorReporter> {
        self.inner.reporter.clone()
    }

    pub fn stats(&self) -> &RouterStats {
        &self.inner.stats
    }

    /// Bind `handler` to `channel`.
    ///
    /// Handlers for the same channel run in registration order. The handler
    /// stays bound until the returned `Registration` is disposed or dropped.
    #[must_use = "dropping the registration unregisters the handler"]
    pub fn register<F>(&self, channel: impl Into<String>, handler: F) -> Registration
    where
        F: Fn(&ChannelEnvelope) -> HandlerResult + Send + Sync + 'static,
    {
        let channel = channel.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut routes = self.inner.routes.write();
            if !routes.handlers.contains_key(&channel) {
                routes.order.push(channel.clone());
            }
            routes
                .handlers
                .entry(channel.clone())
                .or_default()
                .push(HandlerEntry {
                    id,
                    handler: Arc::new(handler),
                });
        }
        debug!(socket = %self.inner.socket, %channel, id, "Handler registered");

        Registration {
            router: Some(Arc::downgrade(&self.inner)),
            channel,
            id,
        }
    }

    /// Enable or disable a channel. Disabled channels are not joined and
    /// their envelopes are dropped.
    pub fn set_enabled(&self, channel: &str, enabled: bool) {
        let mut routes = self.inner.routes.write();
        if enabled {
            routes.disabled.remove(channel);
        } else {
            routes.disabled.insert(channel.to_string());
        }
        info!(socket = %self.inner.socket, %channel, enabled, "Channel enablement changed");
    }

    pub fn is_enabled(&self, channel: &str) -> bool {
        !self.inner.routes.read().disabled.contains(channel)
    }

    /// Registered, enabled channels in first-registration order.
    pub fn channels(&self) -> Vec<String> {
        let routes = self.inner.routes.read();
        routes
            .order
            .iter()
            .filter(|c| !routes.disabled.contains(*c))
            .cloned()
            .collect()
    }

    /// Every registered channel in first-registration order, enabled or not.
    pub fn registered_channels(&self) -> Vec<String> {
        self.inner.routes.read().order.clone()
    }

    /// Number of handlers bound to `channel`.
    pub fn handler_count(&self, channel: &str) -> usize {
        self.inner
            .routes
            .read()
            .handlers
            .get(channel)
            .map_or(0, Vec::len)
    }

    /// Join frames for every registered, enabled channel.
    pub fn join_frames(&self) -> WsResult<Vec<String>> {
        self.channels()
            .into_iter()
            .map(|channel| Ok(serde_json::to_string(&JoinRequest::new(channel))?))
            .collect()
    }

    /// Deliver an envelope to every handler of its channel.
    ///
    /// Returns the number of handlers invoked. A failing handler is
    /// reported and does not stop the remaining handlers.
    pub fn dispatch(&self, envelope: &ChannelEnvelope) -> usize {
        let handlers: Vec<Handler> = {
            let routes = self.inner.routes.read();
            if routes.disabled.contains(&envelope.channel) {
                Vec::new()
            } else {
                routes
                    .handlers
                    .get(&envelope.channel)
                    .map(|entries| entries.iter().map(|e| e.handler.clone()).collect())
                    .unwrap_or_default()
            }
        };

        if handlers.is_empty() {
            self.inner.stats.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(
                socket = %self.inner.socket,
                channel = %envelope.channel,
                "No handler for channel, dropping"
            );
            return 0;
        }

        for handler in &handlers {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(envelope)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };
            self.inner
                .stats
                .handler_failures
                .fetch_add(1, Ordering::Relaxed);
            self.inner.reporter.report(ErrorReport::Handler {
                socket: self.inner.socket.clone(),
                channel: envelope.channel.clone(),
                error,
            });
        }

        self.inner.stats.dispatched.fetch_add(1, Ordering::Relaxed);
        handlers.len()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Handle for one handler binding.
///
/// Dropping it unregisters the handler; `dispose` does the same explicitly.
pub struct Registration {
    router: Option<Weak<RouterInner>>,
    channel: String,
    id: u64,
}

impl Registration {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Unregister now.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(inner) = self.router.take().and_then(|weak| weak.upgrade()) {
            inner.unregister(&self.channel, self.id);
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .finish()
    }
}
