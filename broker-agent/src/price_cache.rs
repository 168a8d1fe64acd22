//! Per-broker price table.
//!
//! Shared between the price-subscription handler (writer) and the
//! order-handling path (reader); the lock keeps per-symbol operations
//! linearizable. Updates are unconditional overwrites with no timestamp
//! check: a late-arriving stale event silently replaces a fresher price.
//! That is documented last-writer-wins behavior, inherited from the bus
//! giving no cross-publisher ordering.

use std::collections::HashMap;
use std::sync::RwLock;

use market_core::MarketError;

#[derive(Default)]
pub struct PriceCache {
    prices: RwLock<HashMap<String, u64>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the latest known price for `symbol`.
    pub fn upsert(&self, symbol: &str, price: u64) {
        self.prices
            .write()
            .unwrap()
            .insert(symbol.to_string(), price);
    }

    /// Looks up the latest known price.
    ///
    /// # Returns
    ///
    /// * `Ok(price)` in cents.
    /// * `Err(MarketError::UnknownSymbol)` if the symbol has never been
    ///   price-updated.
    pub fn get(&self, symbol: &str) -> Result<u64, MarketError> {
        self.prices
            .read()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| MarketError::UnknownSymbol(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_symbol_is_unknown() {
        let cache = PriceCache::new();
        assert!(matches!(
            cache.get("ZZZZ"),
            Err(MarketError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn upsert_is_last_writer_wins() {
        let cache = PriceCache::new();
        cache.upsert("AAPL", 10000);
        cache.upsert("AAPL", 9950);
        assert_eq!(cache.get("AAPL").unwrap(), 9950);
    }
}
