//! Hierarchical bus subjects.
//!
//! Subjects are dot-delimited token paths. Subscription patterns may use
//! `*` to match exactly one token and a terminal `>` to match one or more
//! trailing tokens.
//!
//! Names interpolated into a subject (symbols, broker and client
//! identities) must be single tokens: a dot inside one (`BRK.A`) splits
//! it into two tokens, so the subject falls outside the single-`*`
//! patterns below and subscribers silently miss it. There is no escaping
//! rule; callers pick dot-free names.

/// Pattern matching every subject on the bus.
pub const ALL: &str = ">";

/// Pattern matching price broadcasts for every symbol.
pub const PRICE_WILDCARD: &str = "PriceAdjustment.*";

/// Broadcast subject for one symbol's price adjustments.
///
/// The symbol must be a single token (no dots); see the module docs.
pub fn price_adjustment(symbol: &str) -> String {
    format!("PriceAdjustment.{symbol}")
}

/// Request subject for orders from one client to one broker.
pub fn order(broker: &str, client: &str) -> String {
    format!("Order.{broker}.{client}")
}

/// Pattern a broker subscribes to for orders from any of its clients.
pub fn order_wildcard(broker: &str) -> String {
    format!("Order.{broker}.*")
}

/// Extracts `(broker, client)` from an order subject.
///
/// # Returns
///
/// * `Some((broker, client))` for a subject of the exact form
///   `Order.<broker>.<client>`.
/// * `None` for anything else.
pub fn parse_order(subject: &str) -> Option<(&str, &str)> {
    let mut tokens = subject.split('.');
    if tokens.next()? != "Order" {
        return None;
    }
    let broker = tokens.next()?;
    let client = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    Some((broker, client))
}

/// Whether `pattern` matches `subject`, token by token.
pub fn matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');
    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            // `>` swallows the rest, but must match at least one token.
            (Some(">"), Some(_)) => return true,
            (Some(">"), None) => return false,
            (Some("*"), Some(_)) => {}
            (Some(p), Some(s)) if p == s => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_subjects_match_themselves() {
        assert!(matches("PriceAdjustment.AAPL", "PriceAdjustment.AAPL"));
        assert!(!matches("PriceAdjustment.AAPL", "PriceAdjustment.TSLA"));
    }

    #[test]
    fn star_matches_exactly_one_token() {
        assert!(matches(PRICE_WILDCARD, "PriceAdjustment.AAPL"));
        assert!(!matches(PRICE_WILDCARD, "PriceAdjustment"));
        assert!(!matches(PRICE_WILDCARD, "PriceAdjustment.AAPL.extra"));
        assert!(matches("Order.brokerA.*", "Order.brokerA.client7"));
        assert!(!matches("Order.brokerA.*", "Order.brokerB.client7"));
    }

    #[test]
    fn dotted_names_split_into_tokens_and_miss_single_star_patterns() {
        // A dotted symbol leaves the per-symbol broadcast pattern; only
        // the full-tail wildcard still sees it.
        assert!(!matches(PRICE_WILDCARD, &price_adjustment("BRK.A")));
        assert!(matches("PriceAdjustment.>", &price_adjustment("BRK.A")));
        assert_eq!(parse_order(&order("brokerA", "desk.7")), None);
    }

    #[test]
    fn gt_matches_any_tail() {
        assert!(matches(ALL, "PriceAdjustment.AAPL"));
        assert!(matches(ALL, "Order.brokerA.client7"));
        assert!(matches("Order.>", "Order.brokerA.client7"));
        assert!(!matches("Order.>", "Order"));
    }

    #[test]
    fn order_subject_round_trip() {
        let subject = order("brokerA", "client7");
        assert_eq!(parse_order(&subject), Some(("brokerA", "client7")));
        assert_eq!(parse_order("PriceAdjustment.AAPL"), None);
        assert_eq!(parse_order("Order.brokerA"), None);
        assert_eq!(parse_order("Order.brokerA.client7.extra"), None);
    }
}
