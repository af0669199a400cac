//! Headless side-effect sinks.
//!
//! Without a UI, sounds and toasts are written to the log.

use tracing::info;
use tradefeed_alerts::{SoundPlayer, Toast, ToastSink};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSoundPlayer;

impl SoundPlayer for LogSoundPlayer {
    fn play(&self, asset: &str, volume: f32) {
        info!(asset, volume, "Play sound");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogToastSink;

impl ToastSink for LogToastSink {
    fn show(&self, toast: Toast) {
        info!(
            kind = toast.kind.as_str(),
            title = %toast.title,
            body = %toast.body,
            image = toast.image.as_deref().unwrap_or_default(),
            "Toast"
        );
    }

    fn dismiss_all(&self) {
        info!("Dismiss all toasts");
    }
}
