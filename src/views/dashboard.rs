use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::{
    catalog::StockCatalog,
    demo,
    feed::{FeedEvent, MarketTable},
    portfolio::{PortfolioItem, PortfolioSummary},
    session::Session,
    trade::Trade,
};

use super::{Activation, Route, StockBrowser};

pub struct DashboardView {
    session: Session,
    catalog: Arc<StockCatalog>,
    username: String,
    recent_trades: Vec<Trade>,
    portfolio: Vec<PortfolioItem>,
    market: MarketTable,
    show_stocks_modal: bool,
    pub browser: StockBrowser,
}

impl DashboardView {
    pub fn new(session: Session, catalog: Arc<StockCatalog>) -> Self {
        Self {
            session,
            catalog,
            username: String::new(),
            recent_trades: vec![],
            portfolio: vec![],
            market: MarketTable::new(),
            show_stocks_modal: false,
            browser: StockBrowser::new(),
        }
    }

    pub fn activate(&mut self) -> Activation {
        if !self.session.is_logged_in() {
            debug!("Dashboard requires a session, redirecting");
            return Activation::Redirect(Route::Login);
        }
        self.username = self.session.username();
        self.load_demo_data();
        // rows come back with the next snapshot
        self.market = MarketTable::new();
        Activation::Ready
    }

    fn load_demo_data(&mut self) {
        self.recent_trades = demo::recent_trades();
        self.portfolio = demo::portfolio();
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn recent_trades(&self) -> &[Trade] {
        &self.recent_trades
    }

    pub fn portfolio(&self) -> &[PortfolioItem] {
        &self.portfolio
    }

    pub fn summary(&self) -> PortfolioSummary {
        PortfolioSummary::from_items(&self.portfolio)
    }

    pub fn market(&self) -> &MarketTable {
        &self.market
    }

    pub fn apply_feed_event(&mut self, event: FeedEvent) -> bool {
        self.market.apply(event)
    }

    pub fn is_stocks_modal_open(&self) -> bool {
        self.show_stocks_modal
    }

    pub async fn open_stocks_modal(&mut self) {
        self.show_stocks_modal = true;
        self.browser.load(&self.catalog).await;
    }

    /// Hides the lookup modal and forgets its search and selection.
    pub fn close_stocks_modal(&mut self) {
        self.show_stocks_modal = false;
        self.browser.reset();
    }

    pub fn logout(&mut self) -> Result<Route> {
        self.session.logout()?;
        info!("{} logged out from dashboard", self.username);
        self.username.clear();
        Ok(Route::Login)
    }
}
