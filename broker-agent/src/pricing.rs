//! Deterministic pricing against the latest known price.
//!
//! This is not a matching engine: no order book, no price discovery. The
//! broker's cut is 10% of notional, truncated toward zero; buys pay it on
//! top, sells have it deducted.

use market_core::{MarketError, OrderReceipt, OrderRequest, Side};

/// Prices a request at `price` cents per share.
///
/// A notional (or buy total) past `u64::MAX` cents rejects the order;
/// such requests are wire-valid but cannot be receipted.
pub fn price_order(price: u64, request: &OrderRequest) -> Result<OrderReceipt, MarketError> {
    let overflow = || MarketError::PricingOverflow {
        symbol: request.symbol.clone(),
        amount: request.amount,
    };
    let cost = price.checked_mul(request.amount).ok_or_else(overflow)?;
    let fee = cost / 10;
    let total = match request.side {
        Side::Buy => cost.checked_add(fee).ok_or_else(overflow)?,
        Side::Sell => cost - fee,
    };
    Ok(OrderReceipt {
        side: request.side,
        symbol: request.symbol.clone(),
        amount: request.amount,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_pays_the_fee_on_top() {
        // AAPL at $100.00, 10 shares: cost 100000, fee 10000.
        let receipt = price_order(10000, &OrderRequest::new(Side::Buy, "AAPL", 10)).unwrap();
        assert_eq!(receipt.total, 110000);
        assert_eq!(receipt.amount, 10);
        assert_eq!(receipt.symbol, "AAPL");
    }

    #[test]
    fn sell_has_the_fee_deducted() {
        let receipt = price_order(10000, &OrderRequest::new(Side::Sell, "AAPL", 10)).unwrap();
        assert_eq!(receipt.total, 90000);
    }

    #[test]
    fn fee_truncates_toward_zero() {
        // cost 15 -> fee 1, not 1.5
        let receipt = price_order(15, &OrderRequest::new(Side::Buy, "PENNY", 1)).unwrap();
        assert_eq!(receipt.total, 16);
        // cost below 10 -> no fee at all
        let receipt = price_order(9, &OrderRequest::new(Side::Sell, "PENNY", 1)).unwrap();
        assert_eq!(receipt.total, 9);
    }

    #[test]
    fn zero_amount_prices_to_zero() {
        let receipt = price_order(10000, &OrderRequest::new(Side::Sell, "AAPL", 0)).unwrap();
        assert_eq!(receipt.total, 0);
    }

    #[test]
    fn overflowing_notional_rejects_the_order() {
        let err = price_order(u64::MAX, &OrderRequest::new(Side::Buy, "AAPL", 2)).unwrap_err();
        assert!(matches!(err, MarketError::PricingOverflow { .. }), "{err}");

        // Notional fits but the buy fee pushes the total past the range.
        let err = price_order(u64::MAX / 2, &OrderRequest::new(Side::Buy, "AAPL", 2)).unwrap_err();
        assert!(matches!(err, MarketError::PricingOverflow { .. }), "{err}");

        // The same notional sells fine: the fee is deducted, not added.
        let receipt = price_order(u64::MAX / 2, &OrderRequest::new(Side::Sell, "AAPL", 2)).unwrap();
        assert_eq!(receipt.amount, 2);
    }
}
