use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};
use rust_decimal::Decimal;

use crate::{
    format::{format_currency, format_date, format_percent, Trend},
    market::MarketDataRow,
    portfolio::{PortfolioItem, PortfolioSummary},
    stock::Stock,
    trade::{Trade, TradeSide, TradeStatus},
    views::{DashboardView, LoginView, Notice, StockBrowser},
};

use super::app::LoginField;

fn trend_style(value: Decimal) -> Style {
    match Trend::from(value) {
        Trend::Up => Style::default().fg(Color::Green),
        Trend::Down => Style::default().fg(Color::Red),
        Trend::Flat => Style::default(),
    }
}

fn header_row<'a>(titles: &[&'a str]) -> Row<'a> {
    Row::new(titles.iter().map(|t| Cell::from(*t)))
        .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan))
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Percentage(width)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Percentage(height)])
        .flex(Flex::Center)
        .areas(area);
    area
}

pub fn render_header(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    summary: Option<&PortfolioSummary>,
) {
    let block = Block::default().title("Trading Dashboard").borders(Borders::ALL);
    let mut spans = vec![Span::styled(
        title.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(summary) = summary {
        spans.push(Span::raw("   Value "));
        spans.push(Span::styled(
            format_currency(summary.total_value),
            Style::default().fg(Color::Yellow),
        ));
        spans.push(Span::raw("   P&L "));
        spans.push(Span::styled(
            format!(
                "{} ({})",
                format_currency(summary.total_profit_loss),
                format_percent(summary.profit_loss_percent())
            ),
            trend_style(summary.total_profit_loss),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

pub fn render_footer(frame: &mut Frame, area: Rect, help: &str) {
    let block = Block::default().borders(Borders::ALL);
    let p = Paragraph::new(Line::from(help.to_string())).block(block);
    frame.render_widget(p, area);
}

pub fn render_login(frame: &mut Frame, area: Rect, login: &LoginView, field: LoginField) {
    let area = centered(area, 50, 60);
    let block = Block::default().title("Sign in").borders(Borders::ALL);

    let focus = |f: LoginField| {
        if f == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Username: ", focus(LoginField::Username)),
            Span::raw(login.username.clone()),
        ]),
        Line::from(vec![
            Span::styled("Password: ", focus(LoginField::Password)),
            Span::raw("*".repeat(login.password.chars().count())),
        ]),
        Line::default(),
    ];
    if login.is_loading() {
        lines.push(Line::from(Span::styled(
            "Signing in...",
            Style::default().fg(Color::Blue),
        )));
    }
    if let Some(error) = login.error_message() {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn render_dashboard(frame: &mut Frame, area: Rect, dashboard: &DashboardView) {
    let [market_area, bottom_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Fill(1)]).areas(area);
    let [portfolio_area, trades_area] =
        Layout::horizontal([Constraint::Fill(3), Constraint::Fill(2)]).areas(bottom_area);

    render_market(frame, market_area, dashboard.market().rows());
    render_portfolio(frame, portfolio_area, dashboard.portfolio());
    render_trades(frame, trades_area, dashboard.recent_trades());
}

fn render_market(frame: &mut Frame, area: Rect, rows: &[MarketDataRow]) {
    let block = Block::default().title("Market").borders(Borders::ALL);
    if rows.is_empty() {
        let p = Paragraph::new(Line::from("Waiting for market data...")).block(block);
        frame.render_widget(p, area);
        return;
    }
    let table = Table::new(
        rows.iter().map(Row::from),
        [
            Constraint::Length(12),
            Constraint::Fill(1),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["Symbol", "Name", "Price", "Change", "Volume"]))
    .block(block);
    frame.render_widget(table, area);
}

fn render_portfolio(frame: &mut Frame, area: Rect, items: &[PortfolioItem]) {
    let block = Block::default().title("Portfolio").borders(Borders::ALL);
    let table = Table::new(
        items.iter().map(Row::from),
        [
            Constraint::Length(8),
            Constraint::Fill(1),
            Constraint::Length(6),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Length(14),
            Constraint::Length(13),
        ],
    )
    .header(header_row(&["Symbol", "Name", "Qty", "Avg", "Current", "Value", "P&L"]))
    .block(block);
    frame.render_widget(table, area);
}

fn render_trades(frame: &mut Frame, area: Rect, trades: &[Trade]) {
    let block = Block::default().title("Recent Trades").borders(Borders::ALL);
    let table = Table::new(
        trades.iter().map(Row::from),
        [
            Constraint::Length(5),
            Constraint::Length(7),
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Fill(1),
        ],
    )
    .header(header_row(&["ID", "Symbol", "Side", "Qty", "Total", "Status", "Date"]))
    .block(block);
    frame.render_widget(table, area);
}

pub fn render_browser_popup(frame: &mut Frame, area: Rect, browser: &StockBrowser) {
    let area = centered(area, 80, 90);
    frame.render_widget(Clear, area);
    render_browser(frame, area, browser);
}

pub fn render_browser(frame: &mut Frame, area: Rect, browser: &StockBrowser) {
    let [search_area, list_area] =
        Layout::vertical([Constraint::Length(3), Constraint::Fill(1)]).areas(area);

    let search = Paragraph::new(Line::from(vec![
        Span::raw("Search: "),
        Span::styled(browser.search_query().to_string(), Style::default().fg(Color::Yellow)),
    ]))
    .block(Block::default().title("Stocks").borders(Borders::ALL));
    frame.render_widget(search, search_area);

    let block = Block::default().borders(Borders::ALL);
    if browser.is_loading() {
        frame.render_widget(Paragraph::new("Loading stocks...").block(block), list_area);
        return;
    }

    let filtered = browser.filtered();
    if filtered.is_empty() {
        frame.render_widget(Paragraph::new("No stocks match").block(block), list_area);
    } else {
        let table = Table::new(
            filtered.iter().map(|stock| Row::from(*stock)),
            [
                Constraint::Length(12),
                Constraint::Fill(1),
                Constraint::Length(20),
                Constraint::Length(14),
                Constraint::Length(10),
            ],
        )
        .header(header_row(&["Symbol", "Name", "Sector", "Price", "Change"]))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .block(block);
        let mut state = TableState::default().with_selected(Some(browser.cursor()));
        frame.render_stateful_widget(table, list_area, &mut state);
    }

    if let Some(stock) = browser.selected() {
        render_stock_detail(frame, area, stock);
    }
}

fn render_stock_detail(frame: &mut Frame, area: Rect, stock: &Stock) {
    let area = centered(area, 60, 60);
    frame.render_widget(Clear, area);

    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:<12}"), Style::default().fg(Color::Cyan)),
            Span::raw(value),
        ])
    };
    let lines = vec![
        field("Name", stock.name.clone()),
        field("Market", stock.market.clone()),
        field("Sector", stock.sector.clone()),
        field("Price", format_currency(stock.current_price)),
        Line::from(vec![
            Span::styled(format!("{:<12}", "Change"), Style::default().fg(Color::Cyan)),
            Span::styled(
                format_percent(stock.change_percent),
                trend_style(stock.change_percent),
            ),
        ]),
        field("Volume", stock.volume.to_string()),
        field("Market cap", format_currency(Decimal::from(stock.market_cap))),
        field("Updated", stock.updated_at.format("%b %-d, %Y %H:%M").to_string()),
    ];

    let block = Block::default()
        .title(stock.symbol.clone())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn render_notice(frame: &mut Frame, area: Rect, notice: &Notice) {
    let area = centered(area, 50, 25);
    frame.render_widget(Clear, area);
    let lines = vec![
        Line::from(notice.message.clone()),
        Line::default(),
        Line::from(Span::styled(
            "Press any key",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];
    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title("Notice")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );
    frame.render_widget(p, area);
}

impl From<&MarketDataRow> for Row<'_> {
    fn from(row: &MarketDataRow) -> Self {
        Row::new(vec![
            Cell::from(Span::styled(row.symbol.clone(), Style::default().fg(Color::Blue))),
            Cell::from(row.name.clone()),
            Cell::from(format_currency(row.price)),
            Cell::from(format_percent(row.change_percent)).style(trend_style(row.change_percent)),
            Cell::from(row.volume.clone()),
        ])
    }
}

impl From<&PortfolioItem> for Row<'_> {
    fn from(item: &PortfolioItem) -> Self {
        Row::new(vec![
            Cell::from(Span::styled(item.symbol.clone(), Style::default().fg(Color::Blue))),
            Cell::from(item.name.clone()),
            Cell::from(item.quantity.to_string()),
            Cell::from(format_currency(item.avg_price)),
            Cell::from(format_currency(item.current_price)),
            Cell::from(format_currency(item.total_value)),
            Cell::from(format_currency(item.profit_loss)).style(trend_style(item.profit_loss)),
        ])
    }
}

impl From<&Trade> for Row<'_> {
    fn from(trade: &Trade) -> Self {
        let side_style = match trade.side {
            TradeSide::Buy => Style::default().fg(Color::Green),
            TradeSide::Sell => Style::default().fg(Color::Red),
        };
        let status_style = match trade.status {
            TradeStatus::Completed => Style::default().fg(Color::Green),
            TradeStatus::Pending => Style::default().fg(Color::Yellow),
            TradeStatus::Cancelled => Style::default().fg(Color::DarkGray),
        };
        Row::new(vec![
            Cell::from(trade.id.clone()),
            Cell::from(trade.symbol.clone()),
            Cell::from(trade.side.to_string()).style(side_style),
            Cell::from(trade.quantity.to_string()),
            Cell::from(format_currency(trade.total)),
            Cell::from(trade.status.to_string()).style(status_style),
            Cell::from(format_date(&trade.date)),
        ])
    }
}

impl From<&Stock> for Row<'_> {
    fn from(stock: &Stock) -> Self {
        Row::new(vec![
            Cell::from(Span::styled(stock.symbol.clone(), Style::default().fg(Color::Blue))),
            Cell::from(stock.name.clone()),
            Cell::from(stock.sector.clone()),
            Cell::from(format_currency(stock.current_price)),
            Cell::from(format_percent(stock.change_percent))
                .style(trend_style(stock.change_percent)),
        ])
    }
}
