use tracing::debug;

use crate::{catalog::StockCatalog, stock::Stock};

use super::Notice;

/// Searchable stock list with a detail selection. Used by the stocks screen
/// and by the dashboard's lookup modal.
#[derive(Clone, Debug, Default)]
pub struct StockBrowser {
    stocks: Vec<Stock>,
    search_query: String,
    is_loading: bool,
    selected: Option<Stock>,
    cursor: usize,
}

impl StockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&mut self, catalog: &StockCatalog) {
        self.is_loading = true;
        let stocks = catalog.list_stocks().await;
        debug!("Browser loaded {} stocks", stocks.len());
        self.stocks = stocks;
        self.is_loading = false;
        self.clamp_cursor();
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn stocks(&self) -> &[Stock] {
        &self.stocks
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search(&mut self, query: &str) {
        self.search_query = query.to_string();
        self.clamp_cursor();
    }

    pub fn push_search_char(&mut self, c: char) {
        self.search_query.push(c);
        self.clamp_cursor();
    }

    pub fn pop_search_char(&mut self) {
        self.search_query.pop();
        self.clamp_cursor();
    }

    /// Stocks matching the search on symbol, name or sector. Recomputed on every call.
    pub fn filtered(&self) -> Vec<&Stock> {
        let query = self.search_query.trim().to_lowercase();
        if query.is_empty() {
            return self.stocks.iter().collect();
        }
        self.stocks
            .iter()
            .filter(|stock| stock.matches_with_sector(&query))
            .collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, down: bool) {
        let len = self.filtered().len();
        if len == 0 {
            self.cursor = 0;
        } else if down {
            self.cursor = (self.cursor + 1).min(len - 1);
        } else {
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    pub fn highlighted(&self) -> Option<&Stock> {
        self.filtered().get(self.cursor).copied()
    }

    pub fn select(&mut self, stock: &Stock) {
        self.selected = Some(stock.clone());
    }

    pub fn select_highlighted(&mut self) -> bool {
        match self.highlighted().cloned() {
            Some(stock) => {
                self.selected = Some(stock);
                true
            }
            None => false,
        }
    }

    pub fn selected(&self) -> Option<&Stock> {
        self.selected.as_ref()
    }

    pub fn close_detail(&mut self) {
        self.selected = None;
    }

    /// Acknowledges a buy request. Nothing is recorded and the selection is kept.
    pub fn buy(&self, stock: &Stock) -> Notice {
        Notice {
            message: format!(
                "Buy order placed for {} ({}) at AED {}",
                stock.symbol, stock.name, stock.current_price
            ),
        }
    }

    pub fn reset(&mut self) {
        self.search_query.clear();
        self.selected = None;
        self.cursor = 0;
    }

    fn clamp_cursor(&mut self) {
        let len = self.filtered().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}
