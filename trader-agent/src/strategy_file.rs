//! Strategy document loader.
//!
//! Layout: the root wraps `when` elements, each a rule in evaluation
//! order:
//!
//! ```xml
//! <strategy>
//!   <when>
//!     <stock>TSLA</stock>
//!     <below>9000</below>
//!     <buy>5</buy>
//!   </when>
//!   <when>
//!     <stock>TSLA</stock>
//!     <above>12000</above>
//!     <sell>all</sell>
//!   </when>
//! </strategy>
//! ```
//!
//! `above`/`below` are optional, strictly-exclusive bounds in cents. A
//! rule carries exactly one of `buy`/`sell`; a `sell` whose text is not a
//! number means "all currently-held shares".

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use market_core::{MarketError, Quantity, Rule, Side, TradingStrategy};

/// Loads and parses a strategy document. Fatal at startup on failure.
pub fn load_strategy(path: impl AsRef<Path>) -> Result<TradingStrategy, MarketError> {
    let path = path.as_ref();
    let raw = std::fs::read(path).map_err(|source| MarketError::Persistence {
        path: path.display().to_string(),
        source,
    })?;
    parse_strategy(&raw)
}

#[derive(Clone, Copy)]
enum RuleField {
    Stock,
    Above,
    Below,
    Action(Side),
}

/// Parses the document body into an ordered rule set.
pub fn parse_strategy(raw: &[u8]) -> Result<TradingStrategy, MarketError> {
    let text = std::str::from_utf8(raw).map_err(|e| MarketError::Decode(e.to_string()))?;
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut rules = Vec::new();
    let mut in_when = false;
    let mut field: Option<RuleField> = None;

    let mut symbol: Option<String> = None;
    let mut above: Option<u64> = None;
    let mut below: Option<u64> = None;
    let mut action: Option<(Side, Quantity)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"when" => {
                    in_when = true;
                    symbol = None;
                    above = None;
                    below = None;
                    action = None;
                }
                b"stock" if in_when => field = Some(RuleField::Stock),
                b"above" if in_when => field = Some(RuleField::Above),
                b"below" if in_when => field = Some(RuleField::Below),
                b"buy" if in_when => field = Some(RuleField::Action(Side::Buy)),
                b"sell" if in_when => field = Some(RuleField::Action(Side::Sell)),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some(current) = field {
                    let value = t.unescape().map_err(|e| MarketError::Decode(e.to_string()))?;
                    match current {
                        RuleField::Stock => symbol = Some(value.into_owned()),
                        RuleField::Above => above = Some(parse_bound("above", &value)?),
                        RuleField::Below => below = Some(parse_bound("below", &value)?),
                        RuleField::Action(side) => {
                            if action.is_some() {
                                return Err(MarketError::Decode(
                                    "rule carries more than one buy/sell action".into(),
                                ));
                            }
                            action = Some((side, parse_quantity(side, &value)?));
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) if in_when => {
                // Self-closing action element: no text at all, same as
                // non-numeric text.
                let side = match e.name().as_ref() {
                    b"buy" => Some(Side::Buy),
                    b"sell" => Some(Side::Sell),
                    _ => None,
                };
                if let Some(side) = side {
                    if action.is_some() {
                        return Err(MarketError::Decode(
                            "rule carries more than one buy/sell action".into(),
                        ));
                    }
                    action = Some((side, parse_quantity(side, "")?));
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"when" => {
                    in_when = false;
                    let symbol = symbol
                        .take()
                        .ok_or_else(|| MarketError::Decode("rule missing <stock>".into()))?;
                    let (side, quantity) = action
                        .take()
                        .ok_or_else(|| MarketError::Decode("rule missing buy/sell action".into()))?;
                    rules.push(Rule {
                        symbol,
                        above: above.take(),
                        below: below.take(),
                        side,
                        quantity,
                    });
                }
                b"buy" | b"sell" => {
                    // `<sell></sell>` produced no text event; an empty sell
                    // still means "all".
                    if let Some(RuleField::Action(side)) = field {
                        if action.is_none() {
                            action = Some((side, parse_quantity(side, "")?));
                        }
                    }
                    field = None;
                }
                b"stock" | b"above" | b"below" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(MarketError::Decode(e.to_string())),
        }
    }
    Ok(TradingStrategy::new(rules))
}

fn parse_bound(field: &str, raw: &str) -> Result<u64, MarketError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| MarketError::Decode(format!("non-numeric <{field}> bound: {raw:?}")))
}

fn parse_quantity(side: Side, raw: &str) -> Result<Quantity, MarketError> {
    match raw.trim().parse::<u64>() {
        Ok(n) => Ok(Quantity::Fixed(n)),
        // Only a sell may be open-ended: "all" (or anything non-numeric)
        // resolves against the ledger at fire time.
        Err(_) if side == Side::Sell => Ok(Quantity::All),
        Err(_) => Err(MarketError::Decode(format!(
            "non-numeric buy amount: {raw:?}"
        ))),
    }
}
