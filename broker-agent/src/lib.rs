//! Broker agent: answers order requests against a live price table.
//!
//! Two concurrent handler loops: one folds broadcast price adjustments
//! into the [`PriceCache`], the other prices incoming order requests and
//! publishes receipts to each request's reply address. A failure in one
//! message's handling is logged and never stops processing of the next.

pub mod price_cache;
pub mod pricing;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, warn};

use market_core::bus::{subject, BusMessage, MessageBus, Subscription};
use market_core::wire;
use market_core::MarketError;

pub use price_cache::PriceCache;

pub struct Broker {
    name: String,
    cache: Arc<PriceCache>,
    bus: Arc<dyn MessageBus>,
}

impl Broker {
    pub fn new(name: impl Into<String>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            name: name.into(),
            cache: Arc::new(PriceCache::new()),
            bus,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribes and serves until the bus is torn down.
    pub async fn run(self) -> Result<()> {
        let prices = self
            .bus
            .subscribe(subject::PRICE_WILDCARD)
            .await
            .context("subscribing to price broadcasts")?;
        let orders = self
            .bus
            .subscribe(&subject::order_wildcard(&self.name))
            .await
            .context("subscribing to order requests")?;

        tokio::join!(
            Self::price_loop(self.cache.clone(), prices),
            self.order_loop(orders),
        );
        Ok(())
    }

    async fn price_loop(cache: Arc<PriceCache>, mut prices: Subscription) {
        while let Some(message) = prices.next().await {
            match wire::decode_price_events(&message.payload) {
                Ok(events) => {
                    for event in events {
                        debug!("price update {} -> {}", event.symbol, event.price);
                        cache.upsert(&event.symbol, event.price);
                    }
                }
                Err(err) => warn!(
                    "dropping malformed price message on {}: {err}",
                    message.subject
                ),
            }
        }
    }

    async fn order_loop(&self, mut orders: Subscription) {
        while let Some(message) = orders.next().await {
            if let Err(err) = self.handle_order(&message).await {
                warn!("order on {} rejected: {err}", message.subject);
            }
        }
    }

    /// Prices one request and replies with a receipt.
    ///
    /// An unknown symbol or an overflowing notional rejects the order:
    /// the error is surfaced for the loop to log and no receipt is
    /// published.
    async fn handle_order(&self, message: &BusMessage) -> Result<(), MarketError> {
        let request = wire::decode_order(&message.payload)?;
        let price = self.cache.get(&request.symbol)?;
        let receipt = pricing::price_order(price, &request)?;

        let Some(reply_to) = message.reply_to.as_deref() else {
            warn!("order on {} carries no reply address", message.subject);
            return Ok(());
        };
        debug!(
            "{:?} {} x{} priced at total {}",
            receipt.side, receipt.symbol, receipt.amount, receipt.total
        );
        self.bus
            .publish(reply_to, wire::encode_receipt(&receipt)?)
            .await
    }
}
