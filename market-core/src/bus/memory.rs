//! In-memory bus backend.
//!
//! Implements [`MessageBus`] over Tokio MPSC channels for tests and the
//! single-process demo. Every subscription gets its own channel; a publish
//! fans out to every matching subscription. Subscriptions whose receiver
//! has been dropped are pruned on the next publish.

use async_trait::async_trait;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::bus::{subject, BusMessage, MessageBus, Subscription};
use crate::error::MarketError;

const SUBSCRIPTION_BUFFER: usize = 256;

struct SubscriptionEntry {
    pattern: String,
    sender: mpsc::Sender<BusMessage>,
}

struct Inner {
    subscriptions: Mutex<Vec<SubscriptionEntry>>,
    reply_seq: AtomicU64,
}

/// Cheaply cloneable handle; clones share one bus.
#[derive(Clone)]
pub struct MemoryBus {
    inner: Arc<Inner>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscriptions: Mutex::new(Vec::new()),
                reply_seq: AtomicU64::new(0),
            }),
        }
    }

    async fn deliver(&self, message: BusMessage) -> Result<(), MarketError> {
        // Snapshot matching senders outside the lock; sends may await on
        // subscriber backpressure.
        let targets: Vec<mpsc::Sender<BusMessage>> = {
            let subscriptions = self.inner.subscriptions.lock().unwrap();
            subscriptions
                .iter()
                .filter(|entry| subject::matches(&entry.pattern, &message.subject))
                .map(|entry| entry.sender.clone())
                .collect()
        };

        let mut any_closed = false;
        for target in targets {
            if target.send(message.clone()).await.is_err() {
                any_closed = true;
            }
        }
        if any_closed {
            let mut subscriptions = self.inner.subscriptions.lock().unwrap();
            let before = subscriptions.len();
            subscriptions.retain(|entry| !entry.sender.is_closed());
            debug!("pruned {} closed subscription(s)", before - subscriptions.len());
        }
        Ok(())
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), MarketError> {
        self.deliver(BusMessage {
            subject: subject.to_string(),
            reply_to: None,
            payload,
        })
        .await
    }

    async fn publish_with_reply(
        &self,
        subject: &str,
        reply_to: &str,
        payload: Vec<u8>,
    ) -> Result<(), MarketError> {
        self.deliver(BusMessage {
            subject: subject.to_string(),
            reply_to: Some(reply_to.to_string()),
            payload,
        })
        .await
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, MarketError> {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut subscriptions = self.inner.subscriptions.lock().unwrap();
        subscriptions.push(SubscriptionEntry {
            pattern: pattern.to_string(),
            sender,
        });
        Ok(Subscription::new(receiver))
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<BusMessage, MarketError> {
        let reply_subject = format!(
            "_REPLY.{}",
            self.inner.reply_seq.fetch_add(1, Ordering::Relaxed)
        );
        let mut replies = self.subscribe(&reply_subject).await?;
        self.publish_with_reply(subject, &reply_subject, payload)
            .await?;

        match tokio::time::timeout(timeout, replies.next()).await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(MarketError::BusClosed),
            Err(_) => Err(MarketError::RequestTimeout(timeout)),
        }
    }
}
