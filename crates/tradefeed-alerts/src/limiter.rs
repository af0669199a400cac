//! Visible-toast limiter.
//!
//! At most `limit` toasts are on screen. Showing one more first dismisses
//! all of them and starts counting from zero. Each toast stops counting
//! `duration` after it was shown; toasts already dismissed by a reset no
//! longer count down.

use crate::sinks::{Toast, ToastSink};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tradefeed_telemetry::Metrics;

pub const DEFAULT_TOAST_LIMIT: usize = 3;
pub const DEFAULT_TOAST_DURATION_MS: u64 = 3000;

#[derive(Debug, Default)]
struct LimiterState {
    visible: usize,
    /// Bumped on every dismiss-all so stale expiries are ignored.
    generation: u64,
}

pub struct ToastLimiter {
    sink: Arc<dyn ToastSink>,
    limit: usize,
    duration: Duration,
    state: Arc<Mutex<LimiterState>>,
}

impl ToastLimiter {
    pub fn new(sink: Arc<dyn ToastSink>, limit: usize, duration_ms: u64) -> Self {
        Self {
            sink,
            limit: limit.max(1),
            duration: Duration::from_millis(duration_ms),
            state: Arc::new(Mutex::new(LimiterState::default())),
        }
    }

    pub fn with_defaults(sink: Arc<dyn ToastSink>) -> Self {
        Self::new(sink, DEFAULT_TOAST_LIMIT, DEFAULT_TOAST_DURATION_MS)
    }

    /// Toasts currently counted as visible.
    pub fn visible(&self) -> usize {
        self.state.lock().visible
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Show a toast, dismissing everything first if the limit is reached.
    pub fn show(&self, toast: Toast) {
        let generation = {
            let mut state = self.state.lock();
            if state.visible >= self.limit {
                debug!(visible = state.visible, limit = self.limit, "Toast limit reached, dismissing all");
                self.sink.dismiss_all();
                state.visible = 0;
                state.generation += 1;
            }
            state.visible += 1;
            state.generation
        };

        Metrics::toast_shown(toast.kind.as_str());
        self.sink.show(toast);
        self.schedule_expiry(generation);
    }

    fn schedule_expiry(&self, generation: u64) {
        let state = self.state.clone();
        let duration = self.duration;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(duration).await;
                    let mut state = state.lock();
                    if state.generation == generation {
                        state.visible = state.visible.saturating_sub(1);
                    }
                });
            }
            Err(_) => warn!("No runtime for toast expiry, visible count will not decay"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{MockToastSink, ToastKind};

    fn toast(n: usize) -> Toast {
        Toast {
            kind: ToastKind::Trade,
            title: format!("toast {n}"),
            body: String::new(),
            image: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fourth_toast_dismisses_all() {
        let mut sink = MockToastSink::new();
        sink.expect_show().times(4).return_const(());
        sink.expect_dismiss_all().times(1).return_const(());
        let limiter = ToastLimiter::with_defaults(Arc::new(sink));

        for n in 0..3 {
            limiter.show(toast(n));
        }
        assert_eq!(limiter.visible(), 3);

        limiter.show(toast(3));
        assert_eq!(limiter.visible(), 1);

        // Only the surviving toast counts down.
        tokio::time::sleep(Duration::from_millis(3001)).await;
        assert_eq!(limiter.visible(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_toasts_free_slots() {
        let mut sink = MockToastSink::new();
        sink.expect_show().times(6).return_const(());
        sink.expect_dismiss_all().never();
        let limiter = ToastLimiter::with_defaults(Arc::new(sink));

        for n in 0..3 {
            limiter.show(toast(n));
        }
        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(limiter.visible(), 3);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(limiter.visible(), 0);

        for n in 3..6 {
            limiter.show(toast(n));
        }
        assert_eq!(limiter.visible(), 3);
    }
}
