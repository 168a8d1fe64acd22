//! Price event model.
//!
//! A `PriceEvent` is one symbol's adjustment decoded from a broadcast
//! price message. Prices are integer cents; no currency conversion.

use serde::{Deserialize, Serialize};

/// A single price adjustment for one symbol. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEvent {
    /// Opaque ticker identity, equality by exact match.
    pub symbol: String,
    /// Signed adjustment applied by the publisher, in cents.
    pub delta: i64,
    /// Absolute price after the adjustment, in cents.
    pub price: u64,
}

impl PriceEvent {
    pub fn new(symbol: impl Into<String>, delta: i64, price: u64) -> Self {
        Self {
            symbol: symbol.into(),
            delta,
            price,
        }
    }
}
