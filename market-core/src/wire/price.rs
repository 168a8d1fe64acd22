//! Price-adjustment message codec.
//!
//! Layout:
//!
//! ```xml
//! <message sent="2026-08-27T10:15:00Z">
//!   <stock>
//!     <name>AAPL</name>
//!     <adjustment>-250</adjustment>
//!     <adjustedPrice>10000</adjustedPrice>
//!   </stock>
//! </message>
//! ```
//!
//! A batch message may carry any number of `stock` entries; each becomes
//! one [`PriceEvent`].

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::MarketError;
use crate::model::price::PriceEvent;
use crate::wire::{decode_err, encode_err, parse_i64, parse_u64};

#[derive(Clone, Copy)]
enum StockField {
    Name,
    Adjustment,
    Price,
}

/// Decodes a price-adjustment message into its events.
///
/// # Returns
///
/// * `Ok(events)` with one event per `stock` entry (possibly empty).
/// * `Err(MarketError::Decode)` if any entry is missing a required field
///   or carries a non-numeric number.
pub fn decode_price_events(payload: &[u8]) -> Result<Vec<PriceEvent>, MarketError> {
    let text = std::str::from_utf8(payload).map_err(decode_err)?;
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut events = Vec::new();
    let mut in_stock = false;
    let mut field: Option<StockField> = None;
    let mut name: Option<String> = None;
    let mut adjustment: Option<i64> = None;
    let mut price: Option<u64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"stock" => {
                    in_stock = true;
                    name = None;
                    adjustment = None;
                    price = None;
                }
                b"name" if in_stock => field = Some(StockField::Name),
                b"adjustment" if in_stock => field = Some(StockField::Adjustment),
                b"adjustedPrice" if in_stock => field = Some(StockField::Price),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some(current) = field {
                    let value = t.unescape().map_err(decode_err)?;
                    match current {
                        StockField::Name => name = Some(value.into_owned()),
                        StockField::Adjustment => {
                            adjustment = Some(parse_i64("adjustment", &value)?)
                        }
                        StockField::Price => price = Some(parse_u64("adjustedPrice", &value)?),
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"stock" => {
                    in_stock = false;
                    let symbol = name
                        .take()
                        .ok_or_else(|| MarketError::Decode("stock entry missing <name>".into()))?;
                    let delta = adjustment.take().ok_or_else(|| {
                        MarketError::Decode("stock entry missing <adjustment>".into())
                    })?;
                    let absolute = price.take().ok_or_else(|| {
                        MarketError::Decode("stock entry missing <adjustedPrice>".into())
                    })?;
                    events.push(PriceEvent::new(symbol, delta, absolute));
                }
                b"name" | b"adjustment" | b"adjustedPrice" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(decode_err(e)),
        }
    }
    Ok(events)
}

/// Encodes events into one price-adjustment message.
///
/// # Arguments
///
/// * `events` - The entries for the batch, one `stock` element each.
/// * `sent` - Preformatted publish timestamp for the `sent` attribute.
pub fn encode_price_events(events: &[PriceEvent], sent: &str) -> Result<Vec<u8>, MarketError> {
    let mut writer = Writer::new(Vec::new());

    let mut root = BytesStart::new("message");
    root.push_attribute(("sent", sent));
    writer.write_event(Event::Start(root)).map_err(encode_err)?;

    for event in events {
        writer
            .write_event(Event::Start(BytesStart::new("stock")))
            .map_err(encode_err)?;
        write_text_element(&mut writer, "name", &event.symbol)?;
        write_text_element(&mut writer, "adjustment", &event.delta.to_string())?;
        write_text_element(&mut writer, "adjustedPrice", &event.price.to_string())?;
        writer
            .write_event(Event::End(BytesEnd::new("stock")))
            .map_err(encode_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("message")))
        .map_err(encode_err)?;
    Ok(writer.into_inner())
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    text: &str,
) -> Result<(), MarketError> {
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .map_err(encode_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(encode_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(encode_err)?;
    Ok(())
}
