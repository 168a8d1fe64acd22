//! Runs the whole market in one process: a broker, a strategy-driven
//! trader, a stock monitor and the surveillance agent share an in-memory
//! bus, driven by a deterministic sequence of price ticks from the
//! command line.
//!
//! Usage:
//!
//! ```text
//! demo-runner --broker brokerA --client client7 \
//!     --strategy strategy.xml --portfolio portfolio.xml \
//!     --tick TSLA:8500 --tick TSLA:9000 --tick AAPL:10000
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use log::info;

use broker_agent::Broker;
use market_core::bus::memory::MemoryBus;
use monitor_agent::StockMonitor;
use market_core::bus::{subject, MessageBus};
use market_core::{wire, PriceEvent};
use surveillance_agent::SurveillanceAgent;
use trader_agent::{load_strategy, PortfolioLedger, Trader};

/// One scripted price, `SYMBOL:CENTS`.
#[derive(Debug, Clone)]
struct Tick {
    symbol: String,
    price: u64,
}

fn parse_tick(raw: &str) -> Result<Tick> {
    let (symbol, price) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("expected SYMBOL:CENTS, got {raw:?}"))?;
    Ok(Tick {
        symbol: symbol.to_string(),
        price: price
            .parse()
            .with_context(|| format!("non-numeric price in tick {raw:?}"))?,
    })
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Single-process market simulation demo")]
struct Args {
    /// Broker identity (order routing and surveillance attribution)
    #[arg(long, default_value = "brokerA")]
    broker: String,

    /// Client identity
    #[arg(long, default_value = "client7")]
    client: String,

    /// Path to the strategy document
    #[arg(long, default_value = "strategy.xml")]
    strategy: PathBuf,

    /// Path to the portfolio document (mutated in place, write-through)
    #[arg(long, default_value = "portfolio.xml")]
    portfolio: PathBuf,

    /// Path to the suspicious-activity log
    #[arg(long, default_value = "suspicions.log")]
    suspicions: PathBuf,

    /// Directory for the per-symbol price history files
    #[arg(long, default_value = "price-history")]
    history_dir: PathBuf,

    /// Scripted price ticks, in order (SYMBOL:CENTS, repeatable)
    #[arg(long = "tick", value_parser = parse_tick)]
    ticks: Vec<Tick>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let strategy = load_strategy(&args.strategy)
        .with_context(|| format!("loading strategy {}", args.strategy.display()))?;
    let portfolio = PortfolioLedger::load(&args.portfolio)
        .with_context(|| format!("loading portfolio {}", args.portfolio.display()))?;
    info!(
        "starting demo: broker={}, client={}, {} rules",
        args.broker,
        args.client,
        strategy.rules().len()
    );

    let bus = MemoryBus::new();
    let surveillance = SurveillanceAgent::new(&args.suspicions, Arc::new(bus.clone()));
    let surveillance_task = tokio::spawn(surveillance.run());
    std::fs::create_dir_all(&args.history_dir)
        .with_context(|| format!("creating history dir {}", args.history_dir.display()))?;
    let monitor = StockMonitor::new(&args.history_dir, Arc::new(bus.clone()));
    let monitor_task = tokio::spawn(monitor.run());
    let broker_task = tokio::spawn(Broker::new(args.broker.clone(), Arc::new(bus.clone())).run());
    let trader = Trader::new(
        args.client.clone(),
        args.broker.clone(),
        strategy,
        portfolio,
        Arc::new(bus.clone()),
    );
    let trader_task = tokio::spawn(trader.run());

    // Let the subscriptions settle before the first tick.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut last_price: HashMap<String, u64> = HashMap::new();
    for tick in &args.ticks {
        let previous = last_price
            .insert(tick.symbol.clone(), tick.price)
            .unwrap_or(tick.price);
        let delta = tick.price as i64 - previous as i64;
        let event = PriceEvent::new(tick.symbol.clone(), delta, tick.price);
        info!("tick {} -> {}", event.symbol, event.price);

        let payload = wire::encode_price_events(&[event], &Utc::now().to_rfc3339())?;
        bus.publish(&subject::price_adjustment(&tick.symbol), payload)
            .await?;

        // One tick at a time: give the trader room to finish its pass,
        // including the 500 ms receipt bound in the worst case.
        tokio::time::sleep(Duration::from_millis(600)).await;
    }

    trader_task.abort();
    broker_task.abort();
    monitor_task.abort();
    surveillance_task.abort();

    let final_ledger = PortfolioLedger::load(&args.portfolio)
        .with_context(|| format!("reloading portfolio {}", args.portfolio.display()))?;
    for (symbol, count) in final_ledger.holdings() {
        info!("final holding {symbol}: {count}");
    }
    Ok(())
}
