//! Toasts for the `notifications` channel.
//!
//! Runs alongside the store binding on the same channel; the toast kind
//! follows the notification status.

use crate::sinks::{Toast, ToastKind, ToastSink};
use std::sync::Arc;
use tradefeed_core::{Channel, Notification, NotificationStatus};
use tradefeed_telemetry::Metrics;
use tradefeed_ws::{ChannelRouter, Registration};

pub fn bind_notification_toasts(router: &ChannelRouter, sink: Arc<dyn ToastSink>) -> Registration {
    router.register(Channel::Notifications.as_str(), move |env| {
        let notification: Notification = env.parse()?;
        let toast = notification_toast(notification);
        Metrics::toast_shown(toast.kind.as_str());
        sink.show(toast);
        Ok(())
    })
}

fn notification_toast(notification: Notification) -> Toast {
    let title = match notification.status {
        NotificationStatus::Pending => "Pending",
        NotificationStatus::Success => "Success",
        NotificationStatus::Failed => "Failed",
        NotificationStatus::Error => "Error",
    };
    Toast {
        kind: ToastKind::from(notification.status),
        title: title.to_string(),
        body: notification.message,
        image: None,
    }
}
