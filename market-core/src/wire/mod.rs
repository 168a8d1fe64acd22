//! XML wire codec.
//!
//! Every bus payload is one XML document with a single root element:
//! `message` for broadcast price events, `order` for requests and
//! `orderReceipt` for the correlated replies. Decoders return
//! [`MarketError::Decode`] on anything malformed; callers are expected to
//! log and drop the message, never to let the error escape the dispatch
//! loop.

mod order;
mod price;

pub use order::{decode_order, decode_receipt, encode_order, encode_receipt};
pub use price::{decode_price_events, encode_price_events};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::MarketError;

/// Payload shapes the surveillance agent cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Root element `order`: a request on its way to a broker.
    OrderRequest,
    /// Root element `orderReceipt`: a broker's reply.
    OrderReceipt,
}

/// Classifies a payload by its root element.
///
/// # Returns
///
/// * `Some(kind)` for order/receipt traffic.
/// * `None` for any other (or unparseable) payload.
pub fn classify(payload: &[u8]) -> Option<PayloadKind> {
    let text = std::str::from_utf8(payload).ok()?;
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return match e.name().as_ref() {
                    b"order" => Some(PayloadKind::OrderRequest),
                    b"orderReceipt" => Some(PayloadKind::OrderReceipt),
                    _ => None,
                };
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

fn parse_u64(field: &str, raw: &str) -> Result<u64, MarketError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| MarketError::Decode(format!("non-numeric {field}: {raw:?}")))
}

fn parse_i64(field: &str, raw: &str) -> Result<i64, MarketError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| MarketError::Decode(format!("non-numeric {field}: {raw:?}")))
}

fn decode_err(err: impl std::fmt::Display) -> MarketError {
    MarketError::Decode(err.to_string())
}

fn encode_err(err: impl std::fmt::Display) -> MarketError {
    MarketError::Encode(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_root_element() {
        let order = br#"<order><buy symbol="AAPL" amount="10" /></order>"#;
        let receipt =
            br#"<orderReceipt><buy symbol="AAPL" amount="10" /><complete amount="110000" /></orderReceipt>"#;
        let price = br#"<message sent="t"><stock><name>AAPL</name></stock></message>"#;

        assert_eq!(classify(order), Some(PayloadKind::OrderRequest));
        assert_eq!(classify(receipt), Some(PayloadKind::OrderReceipt));
        assert_eq!(classify(price), None);
        assert_eq!(classify(b"not xml at all"), None);
        assert_eq!(classify(b""), None);
    }
}
