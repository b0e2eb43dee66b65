use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::{catalog::StockCatalog, session::Session};

use super::{Activation, Route, StockBrowser};

/// Full-screen stock browser.
pub struct StocksView {
    session: Session,
    catalog: Arc<StockCatalog>,
    username: String,
    pub browser: StockBrowser,
}

impl StocksView {
    pub fn new(session: Session, catalog: Arc<StockCatalog>) -> Self {
        Self {
            session,
            catalog,
            username: String::new(),
            browser: StockBrowser::new(),
        }
    }

    pub async fn activate(&mut self) -> Activation {
        if !self.session.is_logged_in() {
            debug!("Stocks screen requires a session, redirecting");
            return Activation::Redirect(Route::Login);
        }
        self.username = self.session.username();
        self.browser.load(&self.catalog).await;
        Activation::Ready
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn go_back(&mut self) -> Route {
        self.browser.reset();
        Route::Dashboard
    }

    pub fn logout(&mut self) -> Result<Route> {
        self.session.logout()?;
        self.username.clear();
        Ok(Route::Login)
    }
}
