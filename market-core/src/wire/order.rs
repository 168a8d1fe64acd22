//! Order request and receipt codec.
//!
//! A request wraps exactly one `buy` or `sell` element; the receipt echoes
//! it and adds a `complete` element carrying the total cost:
//!
//! ```xml
//! <order><buy symbol="AAPL" amount="10" /></order>
//! <orderReceipt><buy symbol="AAPL" amount="10" /><complete amount="110000" /></orderReceipt>
//! ```

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::MarketError;
use crate::model::order::{OrderReceipt, OrderRequest, Side};
use crate::wire::{decode_err, encode_err, parse_u64};

/// Decodes an order request.
///
/// # Returns
///
/// * `Ok(OrderRequest)` for a well-formed request with exactly one
///   `buy`/`sell` element.
/// * `Err(MarketError::Decode)` otherwise.
pub fn decode_order(payload: &[u8]) -> Result<OrderRequest, MarketError> {
    let text = std::str::from_utf8(payload).map_err(decode_err)?;
    let mut reader = Reader::from_str(text);

    let mut order: Option<OrderRequest> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if let Some(side) = element_side(&e)? {
                    if order.is_some() {
                        return Err(MarketError::Decode(
                            "order carries more than one buy/sell element".into(),
                        ));
                    }
                    let (symbol, amount) = side_attributes(&e)?;
                    order = Some(OrderRequest::new(side, symbol, amount));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(decode_err(e)),
        }
    }
    order.ok_or_else(|| MarketError::Decode("order missing buy/sell element".into()))
}

/// Encodes an order request.
pub fn encode_order(order: &OrderRequest) -> Result<Vec<u8>, MarketError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Start(BytesStart::new("order")))
        .map_err(encode_err)?;
    write_side_element(&mut writer, order.side, &order.symbol, order.amount)?;
    writer
        .write_event(Event::End(BytesEnd::new("order")))
        .map_err(encode_err)?;
    Ok(writer.into_inner())
}

/// Decodes an order receipt.
///
/// Both the echoed `buy`/`sell` element and the `complete` element are
/// required.
pub fn decode_receipt(payload: &[u8]) -> Result<OrderReceipt, MarketError> {
    let text = std::str::from_utf8(payload).map_err(decode_err)?;
    let mut reader = Reader::from_str(text);

    let mut echoed: Option<(Side, String, u64)> = None;
    let mut total: Option<u64> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if let Some(side) = element_side(&e)? {
                    let (symbol, amount) = side_attributes(&e)?;
                    echoed = Some((side, symbol, amount));
                } else if e.name().as_ref() == b"complete" {
                    total = Some(required_attribute(&e, "amount").and_then(|v| {
                        parse_u64("complete amount", &v)
                    })?);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(decode_err(e)),
        }
    }

    let (side, symbol, amount) = echoed
        .ok_or_else(|| MarketError::Decode("orderReceipt missing buy/sell element".into()))?;
    let total =
        total.ok_or_else(|| MarketError::Decode("orderReceipt missing complete element".into()))?;
    Ok(OrderReceipt {
        side,
        symbol,
        amount,
        total,
    })
}

/// Encodes an order receipt.
pub fn encode_receipt(receipt: &OrderReceipt) -> Result<Vec<u8>, MarketError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Start(BytesStart::new("orderReceipt")))
        .map_err(encode_err)?;
    write_side_element(&mut writer, receipt.side, &receipt.symbol, receipt.amount)?;

    let mut complete = BytesStart::new("complete");
    complete.push_attribute(("amount", receipt.total.to_string().as_str()));
    writer
        .write_event(Event::Empty(complete))
        .map_err(encode_err)?;

    writer
        .write_event(Event::End(BytesEnd::new("orderReceipt")))
        .map_err(encode_err)?;
    Ok(writer.into_inner())
}

fn element_side(e: &BytesStart) -> Result<Option<Side>, MarketError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(decode_err)?
        .to_string();
    Ok(Side::from_tag(&name))
}

fn side_attributes(e: &BytesStart) -> Result<(String, u64), MarketError> {
    let symbol = required_attribute(e, "symbol")?;
    let amount = required_attribute(e, "amount").and_then(|v| parse_u64("amount", &v))?;
    Ok((symbol, amount))
}

fn required_attribute(e: &BytesStart, key: &str) -> Result<String, MarketError> {
    for attr in e.attributes() {
        let attr = attr.map_err(decode_err)?;
        if attr.key.as_ref() == key.as_bytes() {
            return Ok(attr.unescape_value().map_err(decode_err)?.into_owned());
        }
    }
    Err(MarketError::Decode(format!(
        "element missing required attribute {key:?}"
    )))
}

fn write_side_element(
    writer: &mut Writer<Vec<u8>>,
    side: Side,
    symbol: &str,
    amount: u64,
) -> Result<(), MarketError> {
    let mut element = BytesStart::new(side.tag());
    element.push_attribute(("symbol", symbol));
    element.push_attribute(("amount", amount.to_string().as_str()));
    writer.write_event(Event::Empty(element)).map_err(encode_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_buy_order() -> Result<(), MarketError> {
        let req = decode_order(br#"<order><buy symbol="AAPL" amount="10" /></order>"#)?;
        assert_eq!(req, OrderRequest::new(Side::Buy, "AAPL", 10));
        Ok(())
    }

    #[test]
    fn decodes_sell_order() -> Result<(), MarketError> {
        let req = decode_order(br#"<order><sell symbol="TSLA" amount="20" /></order>"#)?;
        assert_eq!(req, OrderRequest::new(Side::Sell, "TSLA", 20));
        Ok(())
    }

    #[test]
    fn order_without_action_is_malformed() {
        assert!(matches!(
            decode_order(b"<order></order>"),
            Err(MarketError::Decode(_))
        ));
    }

    #[test]
    fn order_missing_amount_is_malformed() {
        assert!(matches!(
            decode_order(br#"<order><buy symbol="AAPL" /></order>"#),
            Err(MarketError::Decode(_))
        ));
    }

    #[test]
    fn order_round_trip() -> Result<(), MarketError> {
        let req = OrderRequest::new(Side::Sell, "MSFT", 7);
        assert_eq!(decode_order(&encode_order(&req)?)?, req);
        Ok(())
    }

    #[test]
    fn receipt_round_trip_preserves_every_field() -> Result<(), MarketError> {
        let receipt = OrderReceipt {
            side: Side::Buy,
            symbol: "AAPL".to_string(),
            amount: 10,
            total: 110000,
        };
        assert_eq!(decode_receipt(&encode_receipt(&receipt)?)?, receipt);
        Ok(())
    }

    #[test]
    fn receipt_missing_complete_is_malformed() {
        let payload = br#"<orderReceipt><buy symbol="AAPL" amount="10" /></orderReceipt>"#;
        assert!(matches!(
            decode_receipt(payload),
            Err(MarketError::Decode(_))
        ));
    }
}
