//! Trader agent: reacts to price events by placing orders per its
//! strategy and folding receipts into the portfolio ledger.
//!
//! The order placement is deliberately synchronous within the price
//! handler: the receipt is applied to the ledger before the next rule or
//! price event is considered. That ordering is load-bearing — an `All`
//! quantity firing twice in one batch sees the already-updated holding,
//! not the pre-batch snapshot.

pub mod portfolio;
pub mod strategy_file;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use market_core::bus::{subject, MessageBus};
use market_core::{
    wire, MarketError, OrderReceipt, OrderRequest, PriceEvent, Quantity, Side, TradingStrategy,
    Transaction,
};

pub use portfolio::PortfolioLedger;
pub use strategy_file::load_strategy;

/// How long a fired transaction waits for its receipt.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(500);

pub struct Trader {
    client: String,
    broker: String,
    strategy: TradingStrategy,
    portfolio: PortfolioLedger,
    bus: Arc<dyn MessageBus>,
    reply_timeout: Duration,
}

impl Trader {
    pub fn new(
        client: impl Into<String>,
        broker: impl Into<String>,
        strategy: TradingStrategy,
        portfolio: PortfolioLedger,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self {
            client: client.into(),
            broker: broker.into(),
            strategy,
            portfolio,
            bus,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    /// Overrides the receipt wait bound (tests use a short one).
    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn portfolio(&self) -> &PortfolioLedger {
        &self.portfolio
    }

    /// Subscribes to all price broadcasts and trades until the bus closes.
    pub async fn run(mut self) -> Result<()> {
        let mut prices = self
            .bus
            .subscribe(subject::PRICE_WILDCARD)
            .await
            .context("subscribing to price broadcasts")?;

        while let Some(message) = prices.next().await {
            match wire::decode_price_events(&message.payload) {
                Ok(events) => {
                    for event in events {
                        self.on_price_event(&event).await;
                    }
                }
                Err(err) => warn!(
                    "dropping malformed price message on {}: {err}",
                    message.subject
                ),
            }
        }
        Ok(())
    }

    /// Evaluates every rule, in strategy-definition order, against one
    /// price event. Failures are logged per transaction and never stop
    /// the pass.
    pub async fn on_price_event(&mut self, event: &PriceEvent) {
        let rules = self.strategy.rules().to_vec();
        for rule in &rules {
            if !rule.matches(event) {
                continue;
            }
            // Quantity resolves now, against the ledger as it stands after
            // any trade earlier in this same pass.
            let shares = match rule.quantity {
                Quantity::Fixed(n) => n,
                Quantity::All => self.portfolio.get_shares(&rule.symbol),
            };
            let transaction = Transaction {
                symbol: rule.symbol.clone(),
                side: rule.side,
                shares,
            };
            info!(
                "rule fired at {}: {:?} {} x{}",
                event.price, transaction.side, transaction.symbol, transaction.shares
            );

            match self.place_order(&transaction).await {
                Ok(receipt) => {
                    if let Err(err) = self.apply_receipt(&receipt) {
                        warn!("receipt for {} applied in memory but not durable: {err}", receipt.symbol);
                    }
                }
                Err(MarketError::RequestTimeout(bound)) => warn!(
                    "abandoning {:?} {} x{}: no receipt within {bound:?}",
                    transaction.side, transaction.symbol, transaction.shares
                ),
                Err(err) => warn!(
                    "order {:?} {} x{} failed: {err}",
                    transaction.side, transaction.symbol, transaction.shares
                ),
            }
        }
    }

    async fn place_order(&self, transaction: &Transaction) -> Result<OrderReceipt, MarketError> {
        let request = OrderRequest::new(
            transaction.side,
            transaction.symbol.clone(),
            transaction.shares,
        );
        let reply = self
            .bus
            .request(
                &subject::order(&self.broker, &self.client),
                wire::encode_order(&request)?,
                self.reply_timeout,
            )
            .await?;
        wire::decode_receipt(&reply.payload)
    }

    fn apply_receipt(&mut self, receipt: &OrderReceipt) -> Result<(), MarketError> {
        let held = self.portfolio.get_shares(&receipt.symbol);
        let updated = match receipt.side {
            Side::Buy => held + receipt.amount,
            Side::Sell => held.saturating_sub(receipt.amount),
        };
        self.portfolio.set_shares(&receipt.symbol, updated)
    }
}
