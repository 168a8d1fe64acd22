//! Publish/subscribe + correlated request/reply abstraction.
//!
//! The transport itself is an external collaborator; agents are written
//! against [`MessageBus`] and never see the backend. [`memory::MemoryBus`]
//! is the in-process implementation used by tests and the demo runner.
//!
//! Delivery is at-least-once with no ordering guarantee across publishers;
//! handlers must tolerate both.

pub mod memory;
pub mod subject;

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::MarketError;

/// One delivered message.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The concrete subject the message was published on.
    pub subject: String,
    /// Correlated reply address, present on requests.
    pub reply_to: Option<String>,
    pub payload: Vec<u8>,
}

/// A live subscription; an mpsc-backed stream of matching messages.
pub struct Subscription {
    receiver: mpsc::Receiver<BusMessage>,
}

impl Subscription {
    pub(crate) fn new(receiver: mpsc::Receiver<BusMessage>) -> Self {
        Self { receiver }
    }

    /// Waits for the next matching message.
    ///
    /// # Returns
    ///
    /// * `Some(message)` on delivery.
    /// * `None` once the bus side has been torn down.
    pub async fn next(&mut self) -> Option<BusMessage> {
        self.receiver.recv().await
    }
}

/// The bus boundary every agent is written against.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Broadcasts `payload` on `subject`.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), MarketError>;

    /// Broadcasts `payload` on `subject`, tagged with a reply address the
    /// receiver can answer on.
    async fn publish_with_reply(
        &self,
        subject: &str,
        reply_to: &str,
        payload: Vec<u8>,
    ) -> Result<(), MarketError>;

    /// Opens a subscription for every subject matching `pattern`.
    async fn subscribe(&self, pattern: &str) -> Result<Subscription, MarketError>;

    /// Publishes a request and waits for the single correlated reply.
    ///
    /// # Returns
    ///
    /// * `Ok(reply)` if one arrives within `timeout`.
    /// * `Err(MarketError::RequestTimeout)` on expiry; the request is then
    ///   abandoned with no retry and no cancellation signal to the peer.
    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<BusMessage, MarketError>;
}
