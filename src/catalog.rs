use std::{collections::HashSet, path::Path};

use anyhow::{bail, Context, Result};
use itertools::Itertools;
use tracing::{debug, info};

use crate::stock::Stock;

const BUNDLED_STOCKS: &str = include_str!("../data/stocks.json");

/// Read-only stock reference data, fixed once loaded.
#[derive(Clone, Debug)]
pub struct StockCatalog {
    stocks: Vec<Stock>,
}

impl StockCatalog {
    pub fn new(stocks: Vec<Stock>) -> Result<Self> {
        let mut seen = HashSet::new();
        for stock in stocks.iter() {
            if !seen.insert(stock.symbol.as_str()) {
                bail!("Duplicate stock symbol {}", stock.symbol);
            }
        }
        Ok(Self { stocks })
    }

    /// Catalog compiled into the binary from `data/stocks.json`.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_STOCKS).context("Failed to parse bundled stock data")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let stocks = serde_json::from_str::<Vec<Stock>>(json)?;
        Self::new(stocks)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read stock data from {}", path.display()))?;
        let catalog = Self::from_json(&content)
            .with_context(|| format!("Invalid stock data in {}", path.display()))?;
        info!("Loaded {} stocks from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    /// All stocks, sorted by symbol.
    pub async fn list_stocks(&self) -> Vec<Stock> {
        sorted_by_symbol(self.stocks.iter())
    }

    /// Stocks whose symbol or name contains `query`, ignoring case, sorted by symbol.
    pub async fn search_stocks(&self, query: &str) -> Vec<Stock> {
        let found = sorted_by_symbol(self.stocks.iter().filter(|stock| stock.matches(query)));
        debug!("Search {:?} matched {} stocks", query, found.len());
        found
    }

    pub async fn stock_by_symbol(&self, symbol: &str) -> Option<Stock> {
        self.stocks.iter().find(|stock| stock.symbol == symbol).cloned()
    }
}

fn sorted_by_symbol<'a>(stocks: impl Iterator<Item = &'a Stock>) -> Vec<Stock> {
    stocks
        .cloned()
        .sorted_by(|a, b| a.symbol.cmp(&b.symbol))
        .collect()
}
