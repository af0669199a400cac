//! Holdings snapshots, global and per token page.

use crate::store::SnapshotStore;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tradefeed_core::HoldingsScope;

#[derive(Debug, Default)]
pub struct HoldingsStores {
    global: SnapshotStore<Value>,
    by_token: DashMap<String, Arc<SnapshotStore<Value>>>,
}

impl HoldingsStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot for `scope`.
    pub fn replace(&self, scope: &HoldingsScope, holdings: Value) {
        match scope {
            HoldingsScope::Global => self.global.replace(holdings),
            HoldingsScope::Token(mint) => self.token_store(mint).replace(holdings),
        }
    }

    pub fn get(&self, scope: &HoldingsScope) -> Option<Value> {
        match scope {
            HoldingsScope::Global => self.global.get(),
            HoldingsScope::Token(mint) => self.by_token.get(mint).and_then(|s| s.get()),
        }
    }

    pub fn global(&self) -> &SnapshotStore<Value> {
        &self.global
    }

    /// Route-scoped store for a token page, created on first use.
    pub fn token_store(&self, mint: &str) -> Arc<SnapshotStore<Value>> {
        self.by_token
            .entry(mint.to_string())
            .or_insert_with(|| Arc::new(SnapshotStore::new()))
            .clone()
    }

    /// Drop a token page's store when the page goes away.
    pub fn release_token(&self, mint: &str) -> bool {
        self.by_token.remove(mint).is_some()
    }

    pub fn token_count(&self) -> usize {
        self.by_token.len()
    }
}
