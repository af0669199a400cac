//! Side-effect policy for tracked-wallet trades and notifications.
//!
//! Every tracker event is stored. Whether it also plays a sound or shows a
//! toast depends on the trade filter, the mute list, tab visibility and
//! user settings read at the moment the event is handled.

pub mod directory;
pub mod error;
pub mod limiter;
pub mod notifications;
pub mod policy;
pub mod settings;
pub mod sinks;

pub use directory::WalletDirectory;
pub use error::{AlertError, AlertResult};
pub use limiter::ToastLimiter;
pub use notifications::bind_notification_toasts;
pub use policy::{PolicyOutcome, PolicyStats, StoredIn, TrackerPolicy};
pub use settings::{AlertSettings, MuteList, SettingsSource, SharedSettings, TradeFilter};
pub use sinks::{SoundPlayer, Toast, ToastKind, ToastSink};
