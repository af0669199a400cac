//! Page state read by long-lived socket callbacks.
//!
//! The UI owns this state and mutates it; socket tasks only read it, and
//! always through `SharedPage` at the moment a frame is handled so that a
//! route change or hover is observed by the very next frame.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default login route. Sockets never reconnect while it is shown.
pub const LOGIN_ROUTE: &str = "/login";

/// Route prefix for per-token pages that own a route-scoped holdings store.
pub const TOKEN_ROUTE_PREFIX: &str = "/token/";

/// Where `holdings` frames should land for the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldingsScope {
    /// Global holdings store.
    Global,
    /// Route-scoped store of a token page (mint from the route).
    Token(String),
}

/// UI location and visibility facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    /// Current route path, e.g. "/", "/token/<mint>", "/login".
    pub route: String,
    /// Whether the browser tab is visible.
    pub tab_active: bool,
    /// Whether the tracker panel is under the pointer (buffer paused).
    pub tracker_hovered: bool,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            route: "/".to_string(),
            tab_active: true,
            tracker_hovered: false,
        }
    }
}

impl PageState {
    pub fn is_login(&self) -> bool {
        self.route == LOGIN_ROUTE || self.route.starts_with("/login/")
    }

    pub fn holdings_scope(&self) -> HoldingsScope {
        match self.route.strip_prefix(TOKEN_ROUTE_PREFIX) {
            Some(rest) => {
                let mint = rest.split(['/', '?']).next().unwrap_or_default();
                if mint.is_empty() {
                    HoldingsScope::Global
                } else {
                    HoldingsScope::Token(mint.to_string())
                }
            }
            None => HoldingsScope::Global,
        }
    }
}

/// Shared, mutable page state.
#[derive(Debug, Clone, Default)]
pub struct SharedPage {
    inner: Arc<RwLock<PageState>>,
}

impl SharedPage {
    pub fn new(state: PageState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> PageState {
        self.inner.read().clone()
    }

    pub fn navigate(&self, route: impl Into<String>) {
        self.inner.write().route = route.into();
    }

    pub fn set_tab_active(&self, active: bool) {
        self.inner.write().tab_active = active;
    }

    pub fn set_tracker_hovered(&self, hovered: bool) {
        self.inner.write().tracker_hovered = hovered;
    }

    pub fn is_login(&self) -> bool {
        self.inner.read().is_login()
    }

    pub fn holdings_scope(&self) -> HoldingsScope {
        self.inner.read().holdings_scope()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holdings_scope_from_route() {
        let mut page = PageState::default();
        assert_eq!(page.holdings_scope(), HoldingsScope::Global);

        page.route = "/token/So11111111111111111111111111111111111111112".to_string();
        assert_eq!(
            page.holdings_scope(),
            HoldingsScope::Token("So11111111111111111111111111111111111111112".to_string())
        );

        page.route = "/token/abc?tab=trades".to_string();
        assert_eq!(page.holdings_scope(), HoldingsScope::Token("abc".to_string()));

        page.route = "/token/".to_string();
        assert_eq!(page.holdings_scope(), HoldingsScope::Global);
    }

    #[test]
    fn test_login_route() {
        let shared = SharedPage::default();
        assert!(!shared.is_login());
        shared.navigate(LOGIN_ROUTE);
        assert!(shared.is_login());
    }

    #[test]
    fn test_shared_page_updates_are_visible_to_clones() {
        let shared = SharedPage::default();
        let reader = shared.clone();
        shared.set_tracker_hovered(true);
        assert!(reader.get().tracker_hovered);
    }
}
