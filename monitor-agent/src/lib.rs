//! Stock monitor: keeps a per-symbol history of every price adjustment.
//!
//! Each broadcast is appended to `<symbol>-log.txt` under the monitor's
//! directory as one timestamped line. By default every symbol on the bus
//! is recorded; a watch list restricts that to named symbols.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use log::warn;

use market_core::bus::{subject, MessageBus};
use market_core::{wire, MarketError, PriceEvent};

pub struct StockMonitor {
    log_dir: PathBuf,
    bus: Arc<dyn MessageBus>,
    /// Symbols to record; empty means all of them.
    watch_list: Vec<String>,
}

impl StockMonitor {
    pub fn new(log_dir: impl Into<PathBuf>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            log_dir: log_dir.into(),
            bus,
            watch_list: Vec::new(),
        }
    }

    /// Restricts recording to the given symbols.
    pub fn watch_only(mut self, symbols: Vec<String>) -> Self {
        self.watch_list = symbols;
        self
    }

    /// Records price broadcasts until the bus is torn down.
    pub async fn run(self) -> Result<()> {
        let mut prices = self
            .bus
            .subscribe(subject::PRICE_WILDCARD)
            .await
            .context("subscribing to price broadcasts")?;
        while let Some(message) = prices.next().await {
            match wire::decode_price_events(&message.payload) {
                Ok(events) => {
                    for event in &events {
                        if let Err(err) = self.record(event) {
                            warn!("dropping history entry for {}: {err}", event.symbol);
                        }
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

    /// Appends one adjustment to the symbol's history file.
    pub fn record(&self, event: &PriceEvent) -> Result<(), MarketError> {
        if !self.watches(&event.symbol) {
            return Ok(());
        }
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        self.append(&self.history_path(&event.symbol), &format_entry(&timestamp, event))
    }

    fn watches(&self, symbol: &str) -> bool {
        self.watch_list.is_empty() || self.watch_list.iter().any(|s| s == symbol)
    }

    /// History file for one symbol, `<symbol>-log.txt`.
    pub fn history_path(&self, symbol: &str) -> PathBuf {
        self.log_dir.join(format!("{symbol}-log.txt"))
    }

    fn append(&self, path: &Path, entry: &str) -> Result<(), MarketError> {
        let persistence_err = |source| MarketError::Persistence {
            path: path.display().to_string(),
            source,
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(persistence_err)?;
        file.write_all(entry.as_bytes()).map_err(persistence_err)
    }
}

/// One history line; adjustment keeps its sign, price is in cents.
pub fn format_entry(timestamp: &str, event: &PriceEvent) -> String {
    format!(
        "Timestamp: {timestamp}, Adjustment: {delta}, Price: {price}\n",
        delta = event.delta,
        price = event.price,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::bus::memory::MemoryBus;

    fn monitor(dir: &tempfile::TempDir) -> StockMonitor {
        StockMonitor::new(dir.path(), Arc::new(MemoryBus::new()))
    }

    fn history(monitor: &StockMonitor, symbol: &str) -> String {
        std::fs::read_to_string(monitor.history_path(symbol)).unwrap_or_default()
    }

    #[test]
    fn adjustments_append_to_the_symbols_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = monitor(&dir);

        monitor.record(&PriceEvent::new("TSLA", 500, 9000)).unwrap();
        monitor.record(&PriceEvent::new("TSLA", -250, 8750)).unwrap();
        monitor.record(&PriceEvent::new("AAPL", 100, 10100)).unwrap();

        let tsla = history(&monitor, "TSLA");
        let lines: Vec<&str> = tsla.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Adjustment: 500, Price: 9000"));
        assert!(lines[1].contains("Adjustment: -250, Price: 8750"));

        assert_eq!(history(&monitor, "AAPL").lines().count(), 1);
    }

    #[test]
    fn watch_list_restricts_recording() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = monitor(&dir).watch_only(vec!["TSLA".to_string()]);

        monitor.record(&PriceEvent::new("TSLA", 500, 9000)).unwrap();
        monitor.record(&PriceEvent::new("AAPL", 100, 10100)).unwrap();

        assert_eq!(history(&monitor, "TSLA").lines().count(), 1);
        assert!(!monitor.history_path("AAPL").exists());
    }

    #[test]
    fn entry_fields_are_in_fixed_order() {
        let line = format_entry("2026-08-27 10:15:00.000", &PriceEvent::new("TSLA", -250, 8750));
        assert_eq!(
            line,
            "Timestamp: 2026-08-27 10:15:00.000, Adjustment: -250, Price: 8750\n"
        );
    }

    #[tokio::test]
    async fn records_broadcasts_from_the_bus() {
        let dir = tempfile::tempdir().unwrap();
        let bus = MemoryBus::new();
        let monitor = StockMonitor::new(dir.path(), Arc::new(bus.clone()));
        let history_path = monitor.history_path("TSLA");
        let task = tokio::spawn(monitor.run());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let payload =
            wire::encode_price_events(&[PriceEvent::new("TSLA", 500, 9000)], "2026-08-27T10:15:00Z")
                .unwrap();
        bus.publish(&subject::price_adjustment("TSLA"), payload)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let recorded = std::fs::read_to_string(&history_path).unwrap();
        assert!(recorded.contains("Adjustment: 500, Price: 9000"));
        task.abort();
    }
}
