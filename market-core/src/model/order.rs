use serde::{Deserialize, Serialize};

/// Which way a trade goes. Closed variant; the wire tag is `buy`/`sell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the wire element name for this side.
    pub fn tag(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    /// Maps a wire element name back to a side, if it is one.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

/// A request for the broker to price and execute a trade.
///
/// One request is sent per fired rule; the correlated reply is an
/// [`OrderReceipt`]. All amounts are share counts, all prices cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub side: Side,
    pub symbol: String,
    pub amount: u64,
}

impl OrderRequest {
    pub fn new(side: Side, symbol: impl Into<String>, amount: u64) -> Self {
        Self {
            side,
            symbol: symbol.into(),
            amount,
        }
    }
}

/// The broker's reply to an [`OrderRequest`].
///
/// Echoes the order and carries the total transaction cost in cents
/// (notional plus fee for buys, minus fee for sells).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub side: Side,
    pub symbol: String,
    pub amount: u64,
    pub total: u64,
}
