//! Latest balance per (mint, wallet).

use dashmap::DashMap;
use tradefeed_core::{TransactionUpdate, WalletAddress};

type BookKey = (String, WalletAddress);

#[derive(Debug, Default)]
pub struct TransactionBook {
    entries: DashMap<BookKey, TransactionUpdate>,
}

impl TransactionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for the update's (mint, wallet).
    /// Returns true when the pair was not seen before.
    pub fn upsert(&self, update: TransactionUpdate) -> bool {
        let key = (update.mint.clone(), update.wallet.clone());
        self.entries.insert(key, update).is_none()
    }

    pub fn get(&self, mint: &str, wallet: &WalletAddress) -> Option<TransactionUpdate> {
        self.entries
            .get(&(mint.to_string(), wallet.clone()))
            .map(|e| e.value().clone())
    }

    /// Every wallet's latest update for `mint`, ordered by wallet.
    pub fn for_mint(&self, mint: &str) -> Vec<TransactionUpdate> {
        let mut updates: Vec<TransactionUpdate> = self
            .entries
            .iter()
            .filter(|e| e.key().0 == mint)
            .map(|e| e.value().clone())
            .collect();
        updates.sort_by(|a, b| a.wallet.cmp(&b.wallet));
        updates
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(mint: &str, wallet: &str, balance: f64) -> TransactionUpdate {
        TransactionUpdate {
            mint: mint.to_string(),
            wallet: WalletAddress::from(wallet),
            balance,
            balance_str: None,
        }
    }

    #[test]
    fn test_upsert_keeps_latest() {
        let book = TransactionBook::new();
        assert!(book.upsert(update("m1", "w1", 1.0)));
        assert!(!book.upsert(update("m1", "w1", 2.5)));
        assert!(book.upsert(update("m1", "w2", 4.0)));
        assert!(book.upsert(update("m2", "w1", 9.0)));

        assert_eq!(book.len(), 3);
        assert_eq!(book.get("m1", &"w1".into()).map(|u| u.balance), Some(2.5));

        let m1: Vec<f64> = book.for_mint("m1").iter().map(|u| u.balance).collect();
        assert_eq!(m1, vec![2.5, 4.0]);
    }
}
