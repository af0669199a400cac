//! Side-effect collaborators: sound playback and toast display.

use tradefeed_core::NotificationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Trade,
    Info,
    Success,
    Error,
}

impl ToastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trade => "trade",
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl From<NotificationStatus> for ToastKind {
    fn from(status: NotificationStatus) -> Self {
        match status {
            NotificationStatus::Pending => Self::Info,
            NotificationStatus::Success => Self::Success,
            NotificationStatus::Failed | NotificationStatus::Error => Self::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub body: String,
    pub image: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
pub trait SoundPlayer: Send + Sync {
    /// Play `asset` at `volume` (0.0..=1.0).
    fn play(&self, asset: &str, volume: f32);
}

#[cfg_attr(test, mockall::automock)]
pub trait ToastSink: Send + Sync {
    fn show(&self, toast: Toast);
    fn dismiss_all(&self);
}
