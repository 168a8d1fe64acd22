//! # Market Core Library
//!
//! A shared foundation for the market simulator agents (broker, trader,
//! surveillance).
//!
//! ## Modules
//! - `model`: Common data types (PriceEvent, OrderRequest, Rule) shared by all agents.
//! - `wire`: XML codec for the bus payloads (price events, orders, receipts).
//! - `bus`: Publish/subscribe + request/reply abstraction with an in-memory backend.
//! - `error`: Typed failure taxonomy shared across agents.

pub mod bus;
pub mod error;
pub mod model;
pub mod wire;

pub use error::MarketError;
pub use model::order::{OrderReceipt, OrderRequest, Side};
pub use model::price::PriceEvent;
pub use model::strategy::{Quantity, Rule, TradingStrategy, Transaction};
