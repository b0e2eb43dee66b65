use std::collections::HashSet;

use tracing::{debug, warn};

use crate::market::{MarketDataRow, PriceUpdate};

use super::FeedEvent;

/// Rows shown in the live market table, in arrival order, keyed by symbol.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarketTable {
    rows: Vec<MarketDataRow>,
}

impl MarketTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[MarketDataRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&MarketDataRow> {
        self.rows.iter().find(|row| row.symbol == symbol)
    }

    /// Applies one feed event. Returns whether the table changed.
    pub fn apply(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::Snapshot(rows) => {
                self.replace(rows);
                true
            }
            FeedEvent::Update(update) => self.patch(&update),
        }
    }

    /// Drops every current row and keeps the first occurrence of each symbol.
    pub fn replace(&mut self, rows: Vec<MarketDataRow>) {
        let mut seen = HashSet::new();
        self.rows = rows
            .into_iter()
            .filter(|row| {
                let fresh = seen.insert(row.symbol.clone());
                if !fresh {
                    warn!("Duplicate symbol {} in snapshot", row.symbol);
                }
                fresh
            })
            .collect();
        debug!("Market table replaced with {} rows", self.rows.len());
    }

    /// Sets price and change percent of the matching row. Unknown symbols are ignored.
    pub fn patch(&mut self, update: &PriceUpdate) -> bool {
        match self.rows.iter_mut().find(|row| row.symbol == update.symbol) {
            Some(row) => {
                row.price = update.price;
                row.change_percent = update.change_percent;
                true
            }
            None => {
                debug!("Dropping update for unknown symbol {}", update.symbol);
                false
            }
        }
    }
}
