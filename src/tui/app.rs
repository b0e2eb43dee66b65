use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyModifiers};
use futures_util::StreamExt;
use ratatui::{
    layout::{Constraint, Layout},
    Frame,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    time::{sleep_until, Instant},
};
use tracing::{error, info};

use crate::{
    catalog::StockCatalog,
    config::AppConfig,
    feed::{FeedClient, FeedEvent, FeedHandle},
    session::Session,
    views::{Activation, DashboardView, LoginView, Notice, Route, StockBrowser, StocksView},
};

use super::widgets;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
}

enum BrowserAction {
    None,
    Buy(Notice),
    Close,
}

pub struct App {
    should_quit: bool,
    route: Route,
    config: AppConfig,
    auth_rx: watch::Receiver<bool>,
    login: LoginView,
    login_field: LoginField,
    login_deadline: Option<Instant>,
    dashboard: DashboardView,
    stocks: StocksView,
    feed: Option<FeedHandle>,
    notice: Option<Notice>,
}

impl App {
    pub fn new(session: Session, catalog: Arc<StockCatalog>, config: AppConfig) -> Self {
        Self {
            should_quit: false,
            route: Route::Login,
            auth_rx: session.subscribe(),
            login: LoginView::with_delay(session.clone(), config.login_delay),
            login_field: LoginField::Username,
            login_deadline: None,
            dashboard: DashboardView::new(session.clone(), catalog.clone()),
            stocks: StocksView::new(session, catalog),
            feed: None,
            notice: None,
            config,
        }
    }

    pub async fn run(&mut self, initial: Route) -> Result<()> {
        let mut terminal = ratatui::init();
        let _ = terminal.clear();

        self.navigate(initial).await;

        let mut events = EventStream::new();

        let period = Duration::from_secs_f64(1.0 / 20.0);
        let mut interval = tokio::time::interval(period);

        while !self.should_quit {
            let login_deadline = self.login_deadline;
            tokio::select! {
                _ = interval.tick() => { terminal.draw(|frame| self.render(frame))?; },
                Some(Ok(event)) = events.next() => self.handle_events(event).await,
                Some(event) = next_feed_event(&mut self.feed) => self.handle_feed_event(event),
                _ = sleep_until(login_deadline.unwrap_or_else(Instant::now)),
                    if login_deadline.is_some() =>
                {
                    self.finish_login().await;
                }
                Ok(()) = self.auth_rx.changed() => self.handle_auth_change().await,
            }
        }

        self.close_feed().await;

        Ok(())
    }

    async fn navigate(&mut self, route: Route) {
        let mut route = route;
        loop {
            let activation = match route {
                Route::Login => Activation::Ready,
                Route::Dashboard => self.dashboard.activate(),
                Route::Stocks => self.stocks.activate().await,
            };
            match activation {
                Activation::Ready => break,
                Activation::Redirect(next) => route = next,
            }
        }

        if self.route == Route::Dashboard && route != Route::Dashboard {
            self.dashboard.close_stocks_modal();
            self.close_feed().await;
        }

        info!("Navigated to {}", route);
        self.route = route;

        if route == Route::Dashboard && self.feed.is_none() {
            self.open_feed();
        }
    }

    fn open_feed(&mut self) {
        match FeedClient::new(&self.config.feed_url, self.config.reconnect.clone()) {
            Ok(client) => {
                info!("Opening market feed {}", client.url());
                self.feed = Some(client.spawn());
            }
            Err(err) => error!("Cannot open market feed: {:#}", err),
        }
    }

    async fn close_feed(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.close().await;
        }
    }

    fn handle_feed_event(&mut self, event: FeedEvent) {
        if self.route == Route::Dashboard {
            self.dashboard.apply_feed_event(event);
        }
    }

    async fn handle_auth_change(&mut self) {
        let logged_in = *self.auth_rx.borrow_and_update();
        if !logged_in && self.route != Route::Login {
            self.navigate(Route::Login).await;
        }
    }

    async fn finish_login(&mut self) {
        self.login_deadline = None;
        if let Some(route) = self.login.finish_submit() {
            self.login_field = LoginField::Username;
            self.navigate(route).await;
        }
    }

    async fn handle_events(&mut self, event: Event) {
        let Some(key) = event.as_key_press_event() else {
            return;
        };

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        // the notice blocks everything until dismissed
        if self.notice.take().is_some() {
            return;
        }

        match self.route {
            Route::Login => self.handle_login_key(key),
            Route::Dashboard => self.handle_dashboard_key(key).await,
            Route::Stocks => self.handle_stocks_key(key).await,
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        if self.login.is_loading() {
            return;
        }
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.login_field = match self.login_field {
                    LoginField::Username => LoginField::Password,
                    LoginField::Password => LoginField::Username,
                };
            }
            KeyCode::Backspace => {
                self.focused_login_field().pop();
            }
            KeyCode::Enter => {
                if self.login.can_submit() && self.login.begin_submit() {
                    self.login_deadline = Some(Instant::now() + self.login.delay());
                }
            }
            KeyCode::Char(c) => self.focused_login_field().push(c),
            _ => {}
        }
    }

    fn focused_login_field(&mut self) -> &mut String {
        match self.login_field {
            LoginField::Username => &mut self.login.username,
            LoginField::Password => &mut self.login.password,
        }
    }

    async fn handle_dashboard_key(&mut self, key: KeyEvent) {
        if self.dashboard.is_stocks_modal_open() {
            match browser_key(&mut self.dashboard.browser, key) {
                BrowserAction::Buy(notice) => self.notice = Some(notice),
                BrowserAction::Close => self.dashboard.close_stocks_modal(),
                BrowserAction::None => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('s') => self.dashboard.open_stocks_modal().await,
            KeyCode::Char('p') => self.navigate(Route::Stocks).await,
            KeyCode::Char('l') => match self.dashboard.logout() {
                Ok(route) => self.navigate(route).await,
                Err(err) => error!("Logout failed: {:#}", err),
            },
            _ => {}
        }
    }

    async fn handle_stocks_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('l') {
            match self.stocks.logout() {
                Ok(route) => self.navigate(route).await,
                Err(err) => error!("Logout failed: {:#}", err),
            }
            return;
        }

        match browser_key(&mut self.stocks.browser, key) {
            BrowserAction::Buy(notice) => self.notice = Some(notice),
            BrowserAction::Close => {
                let route = self.stocks.go_back();
                self.navigate(route).await;
            }
            BrowserAction::None => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let [header_area, main_area, footer_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Fill(1),
            Constraint::Length(3),
        ])
        .areas(frame.area());

        match self.route {
            Route::Login => {
                widgets::render_header(frame, header_area, "Trading Dashboard", None);
                widgets::render_login(frame, main_area, &self.login, self.login_field);
                widgets::render_footer(
                    frame,
                    footer_area,
                    "Tab: switch field  Enter: sign in  Esc: quit",
                );
            }
            Route::Dashboard => {
                let summary = self.dashboard.summary();
                widgets::render_header(
                    frame,
                    header_area,
                    &format!("Dashboard  |  {}", self.dashboard.username()),
                    Some(&summary),
                );
                widgets::render_dashboard(frame, main_area, &self.dashboard);
                if self.dashboard.is_stocks_modal_open() {
                    widgets::render_browser_popup(frame, main_area, &self.dashboard.browser);
                    let help = browser_help(&self.dashboard.browser, false);
                    widgets::render_footer(frame, footer_area, help);
                } else {
                    widgets::render_footer(
                        frame,
                        footer_area,
                        "s: stock lookup  p: stocks page  l: logout  q: quit",
                    );
                }
            }
            Route::Stocks => {
                widgets::render_header(
                    frame,
                    header_area,
                    &format!("Stocks  |  {}", self.stocks.username()),
                    None,
                );
                widgets::render_browser(frame, main_area, &self.stocks.browser);
                let help = browser_help(&self.stocks.browser, true);
                widgets::render_footer(frame, footer_area, help);
            }
        }

        if let Some(notice) = &self.notice {
            widgets::render_notice(frame, frame.area(), notice);
        }
    }
}

/// `with_logout` is set on the stocks page, the only place Ctrl+L is bound.
fn browser_help(browser: &StockBrowser, with_logout: bool) -> &'static str {
    match (browser.selected().is_some(), with_logout) {
        (true, _) => "b: buy  Esc: close detail",
        (false, true) => {
            "type to search  Up/Down: move  Enter: details  Ctrl+B: buy  Esc: back  Ctrl+L: logout"
        }
        (false, false) => "type to search  Up/Down: move  Enter: details  Ctrl+B: buy  Esc: close",
    }
}

fn browser_key(browser: &mut StockBrowser, key: KeyEvent) -> BrowserAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if let Some(stock) = browser.selected() {
        return match key.code {
            KeyCode::Char('b') => BrowserAction::Buy(browser.buy(stock)),
            KeyCode::Esc => {
                browser.close_detail();
                BrowserAction::None
            }
            _ => BrowserAction::None,
        };
    }

    match key.code {
        // buying from the list must not open the detail view
        KeyCode::Char('b') if ctrl => match browser.highlighted() {
            Some(stock) => BrowserAction::Buy(browser.buy(stock)),
            None => BrowserAction::None,
        },
        KeyCode::Esc => BrowserAction::Close,
        KeyCode::Up => {
            browser.move_cursor(false);
            BrowserAction::None
        }
        KeyCode::Down => {
            browser.move_cursor(true);
            BrowserAction::None
        }
        KeyCode::Enter => {
            browser.select_highlighted();
            BrowserAction::None
        }
        KeyCode::Backspace => {
            browser.pop_search_char();
            BrowserAction::None
        }
        KeyCode::Char(c) if !ctrl => {
            browser.push_search_char(c);
            BrowserAction::None
        }
        _ => BrowserAction::None,
    }
}

async fn next_feed_event(feed: &mut Option<FeedHandle>) -> Option<FeedEvent> {
    match feed {
        Some(feed) => feed.recv().await,
        None => futures::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    async fn browser() -> StockBrowser {
        let mut browser = StockBrowser::new();
        browser.load(&StockCatalog::bundled().unwrap()).await;
        browser
    }

    #[tokio::test]
    async fn test_buy_from_list_does_not_select() {
        let mut browser = browser().await;
        for c in "emaar".chars() {
            browser_key(&mut browser, press(KeyCode::Char(c), KeyModifiers::NONE));
        }
        let action = browser_key(&mut browser, press(KeyCode::Char('b'), KeyModifiers::CONTROL));
        match action {
            BrowserAction::Buy(notice) => assert!(notice.message.contains("EMAAR")),
            _ => panic!("expected a buy notice"),
        }
        assert!(browser.selected().is_none());
        assert_eq!(browser.search_query(), "emaar");
    }

    #[tokio::test]
    async fn test_modal_help_omits_logout() {
        let mut browser = browser().await;
        assert!(!browser_help(&browser, false).contains("Ctrl+L"));
        assert!(browser_help(&browser, true).contains("Ctrl+L: logout"));

        browser_key(&mut browser, press(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(browser_help(&browser, true), "b: buy  Esc: close detail");
    }

    #[tokio::test]
    async fn test_detail_then_escape() {
        let mut browser = browser().await;
        browser_key(&mut browser, press(KeyCode::Down, KeyModifiers::NONE));
        browser_key(&mut browser, press(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(browser.selected().map(|s| s.symbol.as_str()), Some("ADIB"));

        // typing in the detail view does not touch the search
        browser_key(&mut browser, press(KeyCode::Char('x'), KeyModifiers::NONE));
        assert_eq!(browser.search_query(), "");

        assert!(matches!(
            browser_key(&mut browser, press(KeyCode::Esc, KeyModifiers::NONE)),
            BrowserAction::None
        ));
        assert!(browser.selected().is_none());
        assert!(matches!(
            browser_key(&mut browser, press(KeyCode::Esc, KeyModifiers::NONE)),
            BrowserAction::Close
        ));
    }

    #[tokio::test]
    async fn test_navigate_redirects_without_session() {
        let session = crate::session::SessionStore::in_memory();
        let catalog = Arc::new(StockCatalog::bundled().unwrap());
        let mut app = App::new(session, catalog, AppConfig::default());

        app.navigate(Route::Dashboard).await;
        assert_eq!(app.route, Route::Login);
        assert!(app.feed.is_none());

        app.navigate(Route::Stocks).await;
        assert_eq!(app.route, Route::Login);
    }

    #[tokio::test]
    async fn test_feed_follows_dashboard() {
        let session = crate::session::SessionStore::in_memory();
        session.login("alice", "pw").unwrap();
        let catalog = Arc::new(StockCatalog::bundled().unwrap());
        let mut app = App::new(session.clone(), catalog, AppConfig::default());

        app.navigate(Route::Dashboard).await;
        assert_eq!(app.route, Route::Dashboard);
        assert!(app.feed.is_some());

        app.navigate(Route::Stocks).await;
        assert_eq!(app.route, Route::Stocks);
        assert!(app.feed.is_none());

        session.logout().unwrap();
        app.handle_auth_change().await;
        assert_eq!(app.route, Route::Login);
    }
}
