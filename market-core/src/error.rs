//! Typed failure taxonomy shared across agents.
//!
//! Every failure in the message path is either dropped-and-logged by the
//! handler loop or aborts the enclosing operation; there are no automatic
//! retries anywhere.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    /// A payload could not be decoded (missing field, non-numeric value,
    /// broken markup). Handlers log and drop the message.
    #[error("malformed payload: {0}")]
    Decode(String),

    /// A payload could not be encoded.
    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// An order referenced a symbol that has never been price-updated.
    /// The order is rejected and no receipt is published.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// An order's notional does not fit the wire's integer range. The
    /// order is rejected and no receipt is published.
    #[error("order for {amount} x {symbol} overflows the pricing range")]
    PricingOverflow { symbol: String, amount: u64 },

    /// No correlated reply arrived within the bound. The transaction is
    /// abandoned; no retry, no cancellation signal to the peer.
    #[error("no reply within {0:?}")]
    RequestTimeout(Duration),

    /// A durable-state read or write failed. Fatal at startup; mid-run the
    /// triggering mutation is not considered durable.
    #[error("persistence failure on {path}: {source}")]
    Persistence {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The bus has been torn down underneath a subscriber or requester.
    #[error("message bus closed")]
    BusClosed,
}
