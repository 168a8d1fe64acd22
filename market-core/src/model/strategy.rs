//! Trading strategy model.
//!
//! A strategy is an ordered list of rules. Order matters: rules are
//! evaluated top to bottom for every price event, and a rule firing
//! earlier in the pass changes what `Quantity::All` resolves to for rules
//! firing later in the same pass.

use serde::{Deserialize, Serialize};

use crate::model::order::Side;
use crate::model::price::PriceEvent;

/// How many shares a rule trades when it fires.
///
/// `All` resolves to the holder's currently-owned shares at the moment the
/// rule fires, not at rule-definition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantity {
    Fixed(u64),
    All,
}

/// A conditional trading instruction: symbol + price band + action.
///
/// Both bounds are strictly exclusive; a rule with neither bound always
/// matches its symbol. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub symbol: String,
    /// Fire only if the price is strictly above this, when present.
    pub above: Option<u64>,
    /// Fire only if the price is strictly below this, when present.
    pub below: Option<u64>,
    pub side: Side,
    pub quantity: Quantity,
}

impl Rule {
    /// Whether this rule's trading signal is raised by `event`.
    ///
    /// # Arguments
    ///
    /// * `event` - The decoded price event under evaluation.
    ///
    /// # Returns
    ///
    /// `true` iff the symbols match and the price sits strictly inside the
    /// rule's band.
    pub fn matches(&self, event: &PriceEvent) -> bool {
        if self.symbol != event.symbol {
            return false;
        }
        if let Some(above) = self.above {
            if event.price <= above {
                return false;
            }
        }
        if let Some(below) = self.below {
            if event.price >= below {
                return false;
            }
        }
        true
    }
}

/// An ordered rule set. Evaluation order is the definition order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingStrategy {
    rules: Vec<Rule>,
}

impl TradingStrategy {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// A trade resolved at fire time: `Quantity` has already been turned into
/// a concrete share count. Ephemeral, one per trade attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub symbol: String,
    pub side: Side,
    pub shares: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(above: Option<u64>, below: Option<u64>) -> Rule {
        Rule {
            symbol: "TSLA".to_string(),
            above,
            below,
            side: Side::Buy,
            quantity: Quantity::Fixed(5),
        }
    }

    #[test]
    fn bounds_are_strictly_exclusive() {
        let r = rule(None, Some(9000));
        assert!(r.matches(&PriceEvent::new("TSLA", -500, 8500)));
        // Exactly on the bound never fires.
        assert!(!r.matches(&PriceEvent::new("TSLA", 0, 9000)));

        let r = rule(Some(9000), None);
        assert!(!r.matches(&PriceEvent::new("TSLA", 0, 9000)));
        assert!(r.matches(&PriceEvent::new("TSLA", 1, 9001)));
    }

    #[test]
    fn unbounded_rule_always_matches_its_symbol() {
        let r = rule(None, None);
        assert!(r.matches(&PriceEvent::new("TSLA", 0, 1)));
        assert!(!r.matches(&PriceEvent::new("AAPL", 0, 1)));
    }

    #[test]
    fn band_requires_both_conditions() {
        let r = rule(Some(1000), Some(2000));
        assert!(r.matches(&PriceEvent::new("TSLA", 0, 1500)));
        assert!(!r.matches(&PriceEvent::new("TSLA", 0, 1000)));
        assert!(!r.matches(&PriceEvent::new("TSLA", 0, 2000)));
    }
}
