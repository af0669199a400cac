//! Per-channel state for the tradefeed dashboard.
//!
//! Every channel owns an independent store with either a "replace
//! snapshot" or an "append message" contract. `bind_main` and
//! `bind_monitor` wire the stores to a socket group's router.

pub mod bindings;
pub mod error;
pub mod holdings;
pub mod store;
pub mod stores;
pub mod tracker;
pub mod transactions;

pub use bindings::{bind_main, bind_monitor};
pub use error::{FeedError, FeedResult};
pub use holdings::HoldingsStores;
pub use store::{MessageLog, SnapshotStore};
pub use stores::{ChannelStores, StoreLimits};
pub use tracker::TrackerStore;
pub use transactions::TransactionBook;
