//! Tracked-wallet metadata used to label toasts.

use dashmap::DashMap;
use tradefeed_core::{TrackedWallet, WalletAddress};

#[derive(Debug, Default)]
pub struct WalletDirectory {
    wallets: DashMap<WalletAddress, TrackedWallet>,
}

impl WalletDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_wallets(wallets: impl IntoIterator<Item = TrackedWallet>) -> Self {
        let directory = Self::new();
        for wallet in wallets {
            directory.upsert(wallet);
        }
        directory
    }

    pub fn upsert(&self, wallet: TrackedWallet) {
        self.wallets.insert(wallet.address.clone(), wallet);
    }

    pub fn remove(&self, address: &WalletAddress) -> Option<TrackedWallet> {
        self.wallets.remove(address).map(|(_, wallet)| wallet)
    }

    pub fn get(&self, address: &WalletAddress) -> Option<TrackedWallet> {
        self.wallets.get(address).map(|w| w.value().clone())
    }

    /// Display label, or the shortened address for unknown wallets.
    pub fn label_for(&self, address: &WalletAddress) -> String {
        self.wallets
            .get(address)
            .map(|w| w.display_label())
            .unwrap_or_else(|| address.short())
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_falls_back_to_short_address() {
        let directory = WalletDirectory::from_wallets([TrackedWallet {
            address: "Known1111111111111111".into(),
            name: "whale".to_string(),
            emoji: Some("🐋".to_string()),
        }]);

        assert_eq!(directory.label_for(&"Known1111111111111111".into()), "🐋 whale");
        assert_eq!(
            directory.label_for(&"AbCdEfGhIjKlMnOpWxYz".into()),
            "AbCd...WxYz"
        );

        directory.remove(&"Known1111111111111111".into());
        assert!(directory.is_empty());
    }
}
