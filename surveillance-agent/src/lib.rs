//! Surveillance agent: observes all bus traffic and flags large trades.
//!
//! Requests and replies arrive asynchronously, and transactions from
//! different client/broker pairs are in flight concurrently, so the
//! broker/client identity of each transaction is retained in a map keyed
//! by the request's reply address and consumed by the matching reply —
//! never in a process-wide scalar.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, warn};

use market_core::bus::{subject, BusMessage, MessageBus};
use market_core::wire::{self, PayloadKind};
use market_core::{MarketError, OrderReceipt};

/// Strict cutoff in cents: totals above (not at) this are flagged.
pub const SUSPICIOUS_TOTAL_CENTS: u64 = 500_000;

/// Who traded with whom, captured from the order's routing path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    pub broker: String,
    pub client: String,
}

pub struct SurveillanceAgent {
    log_path: PathBuf,
    bus: Arc<dyn MessageBus>,
    /// In-flight transactions, keyed by reply address.
    pending: Mutex<HashMap<String, IdentityContext>>,
}

impl SurveillanceAgent {
    pub fn new(log_path: impl Into<PathBuf>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            log_path: log_path.into(),
            bus,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Watches every subject until the bus is torn down.
    pub async fn run(self) -> Result<()> {
        let mut traffic = self
            .bus
            .subscribe(subject::ALL)
            .await
            .context("subscribing to all traffic")?;
        while let Some(message) = traffic.next().await {
            if let Err(err) = self.observe(&message) {
                warn!("dropping message on {}: {err}", message.subject);
            }
        }
        Ok(())
    }

    /// Classifies one message and updates the correlation state.
    pub fn observe(&self, message: &BusMessage) -> Result<(), MarketError> {
        match wire::classify(&message.payload) {
            Some(PayloadKind::OrderRequest) => self.observe_request(message),
            Some(PayloadKind::OrderReceipt) => self.observe_reply(message),
            // Price traffic and anything else is not our concern.
            None => Ok(()),
        }
    }

    fn observe_request(&self, message: &BusMessage) -> Result<(), MarketError> {
        let Some((broker, client)) = subject::parse_order(&message.subject) else {
            debug!("order request on unexpected subject {}", message.subject);
            return Ok(());
        };
        let Some(reply_to) = message.reply_to.as_deref() else {
            debug!("order request on {} without reply address", message.subject);
            return Ok(());
        };
        self.pending.lock().unwrap().insert(
            reply_to.to_string(),
            IdentityContext {
                broker: broker.to_string(),
                client: client.to_string(),
            },
        );
        Ok(())
    }

    fn observe_reply(&self, message: &BusMessage) -> Result<(), MarketError> {
        // Decode before touching the correlation map: a malformed payload
        // on a reply subject must not consume the identity a later
        // redelivery still needs.
        let receipt = wire::decode_receipt(&message.payload)?;
        // A reply travels on the reply address its request announced.
        let Some(identity) = self.pending.lock().unwrap().remove(&message.subject) else {
            debug!("unattributable receipt on {}", message.subject);
            return Ok(());
        };
        if receipt.total > SUSPICIOUS_TOTAL_CENTS {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
            self.append_entry(&format_entry(&timestamp, &identity, &receipt))?;
        }
        Ok(())
    }

    fn append_entry(&self, entry: &str) -> Result<(), MarketError> {
        let persistence_err = |source| MarketError::Persistence {
            path: self.log_path.display().to_string(),
            source,
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(persistence_err)?;
        file.write_all(entry.as_bytes()).map_err(persistence_err)
    }
}

/// One suspicious-activity line; fields in fixed order.
pub fn format_entry(timestamp: &str, identity: &IdentityContext, receipt: &OrderReceipt) -> String {
    format!(
        "Timestamp: {timestamp}, Client: {client}, Broker: {broker}, Order Sent: <{side} symbol=\"{symbol}\" amount=\"{amount}\" />, Amount: {total}\n",
        client = identity.client,
        broker = identity.broker,
        side = receipt.side.tag(),
        symbol = receipt.symbol,
        amount = receipt.amount,
        total = receipt.total,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::bus::memory::MemoryBus;
    use market_core::{OrderRequest, Side};

    fn agent(dir: &tempfile::TempDir) -> SurveillanceAgent {
        SurveillanceAgent::new(dir.path().join("suspicions.log"), Arc::new(MemoryBus::new()))
    }

    fn request_message(broker: &str, client: &str, reply_to: &str) -> BusMessage {
        let order = OrderRequest::new(Side::Buy, "AAPL", 10);
        BusMessage {
            subject: subject::order(broker, client),
            reply_to: Some(reply_to.to_string()),
            payload: wire::encode_order(&order).unwrap(),
        }
    }

    fn reply_message(reply_to: &str, total: u64) -> BusMessage {
        let receipt = OrderReceipt {
            side: Side::Buy,
            symbol: "AAPL".to_string(),
            amount: 10,
            total,
        };
        BusMessage {
            subject: reply_to.to_string(),
            reply_to: None,
            payload: wire::encode_receipt(&receipt).unwrap(),
        }
    }

    fn log_contents(agent: &SurveillanceAgent) -> String {
        std::fs::read_to_string(&agent.log_path).unwrap_or_default()
    }

    #[test]
    fn threshold_is_strict() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent(&dir);

        agent.observe(&request_message("brokerA", "client7", "_REPLY.1")).unwrap();
        agent.observe(&reply_message("_REPLY.1", 500_000)).unwrap();
        assert_eq!(log_contents(&agent), "", "exactly the threshold never logs");

        agent.observe(&request_message("brokerA", "client7", "_REPLY.2")).unwrap();
        agent.observe(&reply_message("_REPLY.2", 500_001)).unwrap();
        let log = log_contents(&agent);
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("Client: client7"));
        assert!(log.contains("Broker: brokerA"));
        assert!(log.contains("Amount: 500001"));
    }

    #[test]
    fn concurrent_transactions_keep_their_own_identities() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent(&dir);

        // Both requests observed before either reply.
        agent.observe(&request_message("brokerA", "client7", "_REPLY.1")).unwrap();
        agent.observe(&request_message("brokerB", "client9", "_REPLY.2")).unwrap();

        // Replies land in the opposite order.
        agent.observe(&reply_message("_REPLY.2", 600_000)).unwrap();
        agent.observe(&reply_message("_REPLY.1", 700_000)).unwrap();

        let log = log_contents(&agent);
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Client: client9"));
        assert!(lines[0].contains("Broker: brokerB"));
        assert!(lines[0].contains("Amount: 600000"));
        assert!(lines[1].contains("Client: client7"));
        assert!(lines[1].contains("Broker: brokerA"));
    }

    #[test]
    fn correlation_entry_is_consumed_by_its_reply() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent(&dir);

        agent.observe(&request_message("brokerA", "client7", "_REPLY.1")).unwrap();
        agent.observe(&reply_message("_REPLY.1", 600_000)).unwrap();
        // A duplicate delivery of the reply is unattributable and ignored.
        agent.observe(&reply_message("_REPLY.1", 600_000)).unwrap();

        assert_eq!(log_contents(&agent).lines().count(), 1);
        assert!(agent.pending.lock().unwrap().is_empty());
    }

    #[test]
    fn malformed_reply_does_not_consume_the_identity() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent(&dir);

        agent.observe(&request_message("brokerA", "client7", "_REPLY.1")).unwrap();

        // Receipt-shaped but undecodable: no <complete> element.
        let garbled = BusMessage {
            subject: "_REPLY.1".to_string(),
            reply_to: None,
            payload: br#"<orderReceipt><buy symbol="AAPL" amount="10" /></orderReceipt>"#.to_vec(),
        };
        assert!(agent.observe(&garbled).is_err());
        assert_eq!(agent.pending.lock().unwrap().len(), 1);

        // The redelivered well-formed receipt still attributes and logs.
        agent.observe(&reply_message("_REPLY.1", 600_000)).unwrap();
        let log = log_contents(&agent);
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("Client: client7"));
    }

    #[test]
    fn price_traffic_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent(&dir);
        let message = BusMessage {
            subject: "PriceAdjustment.AAPL".to_string(),
            reply_to: None,
            payload: b"<message sent=\"t\"></message>".to_vec(),
        };
        agent.observe(&message).unwrap();
        assert!(agent.pending.lock().unwrap().is_empty());
        assert_eq!(log_contents(&agent), "");
    }

    #[test]
    fn entry_fields_are_in_fixed_order() {
        let identity = IdentityContext {
            broker: "brokerA".to_string(),
            client: "client7".to_string(),
        };
        let receipt = OrderReceipt {
            side: Side::Sell,
            symbol: "TSLA".to_string(),
            amount: 60,
            total: 600_000,
        };
        let line = format_entry("2026-08-27 10:15:00.000", &identity, &receipt);
        assert_eq!(
            line,
            "Timestamp: 2026-08-27 10:15:00.000, Client: client7, Broker: brokerA, Order Sent: <sell symbol=\"TSLA\" amount=\"60\" />, Amount: 600000\n"
        );
    }
}
