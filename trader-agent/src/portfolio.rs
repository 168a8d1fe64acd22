//! Durable holdings ledger.
//!
//! The in-memory map is the single source of truth between mutations;
//! there is no reload-from-disk on reads. Every mutation is written
//! through to the portfolio document atomically (temp file + rename), so
//! a crash after a successful `set_shares` never loses that update.
//!
//! Document layout:
//!
//! ```xml
//! <portfolio>
//!   <stock symbol="TSLA">20</stock>
//! </portfolio>
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use market_core::MarketError;

#[derive(Debug)]
pub struct PortfolioLedger {
    path: PathBuf,
    shares: BTreeMap<String, u64>,
}

impl PortfolioLedger {
    /// Loads the ledger from its portfolio document.
    ///
    /// Failure here is fatal to the agent: a trader must not start without
    /// its durable holdings.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MarketError> {
        let path = path.into();
        let raw = std::fs::read(&path).map_err(|source| MarketError::Persistence {
            path: path.display().to_string(),
            source,
        })?;
        let shares = parse_portfolio(&raw)?;
        Ok(Self { path, shares })
    }

    /// Current held share count; 0 for a symbol never seen.
    pub fn get_shares(&self, symbol: &str) -> u64 {
        self.shares.get(symbol).copied().unwrap_or(0)
    }

    /// Sets the held count and writes the document through to disk.
    ///
    /// The in-memory value is updated first; if the save fails the caller
    /// must treat the mutation as not durable.
    pub fn set_shares(&mut self, symbol: &str, count: u64) -> Result<(), MarketError> {
        self.shares.insert(symbol.to_string(), count);
        self.save()
    }

    /// All holdings, for logging at shutdown.
    pub fn holdings(&self) -> impl Iterator<Item = (&str, u64)> {
        self.shares.iter().map(|(s, n)| (s.as_str(), *n))
    }

    fn save(&self) -> Result<(), MarketError> {
        let document = encode_portfolio(&self.shares)?;
        write_atomically(&self.path, &document).map_err(|source| MarketError::Persistence {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// Write to a sibling temp file, sync, then rename over the target.
fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    let mut temp_file = std::fs::File::create(&temp_path)?;
    temp_file.write_all(contents)?;
    temp_file.sync_all()?;
    std::fs::rename(&temp_path, path)
}

fn parse_portfolio(raw: &[u8]) -> Result<BTreeMap<String, u64>, MarketError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| MarketError::Decode(e.to_string()))?;
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut shares = BTreeMap::new();
    let mut current_symbol: Option<String> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"stock" => {
                let mut symbol = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| MarketError::Decode(e.to_string()))?;
                    if attr.key.as_ref() == b"symbol" {
                        symbol = Some(
                            attr.unescape_value()
                                .map_err(|e| MarketError::Decode(e.to_string()))?
                                .into_owned(),
                        );
                    }
                }
                current_symbol = Some(symbol.ok_or_else(|| {
                    MarketError::Decode("stock element missing symbol attribute".into())
                })?);
            }
            Ok(Event::Text(t)) => {
                if let Some(symbol) = current_symbol.take() {
                    let value = t.unescape().map_err(|e| MarketError::Decode(e.to_string()))?;
                    let count = value.trim().parse::<u64>().map_err(|_| {
                        MarketError::Decode(format!("non-numeric share count for {symbol}: {value:?}"))
                    })?;
                    shares.insert(symbol, count);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"stock" => current_symbol = None,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(MarketError::Decode(e.to_string())),
        }
    }
    Ok(shares)
}

fn encode_portfolio(shares: &BTreeMap<String, u64>) -> Result<Vec<u8>, MarketError> {
    let encode_err = |e: quick_xml::Error| MarketError::Encode(e.to_string());
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Start(BytesStart::new("portfolio")))
        .map_err(encode_err)?;
    for (symbol, count) in shares {
        let mut stock = BytesStart::new("stock");
        stock.push_attribute(("symbol", symbol.as_str()));
        writer.write_event(Event::Start(stock)).map_err(encode_err)?;
        writer
            .write_event(Event::Text(BytesText::new(&count.to_string())))
            .map_err(encode_err)?;
        writer
            .write_event(Event::End(BytesEnd::new("stock")))
            .map_err(encode_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("portfolio")))
        .map_err(encode_err)?;
    Ok(writer.into_inner())
}
