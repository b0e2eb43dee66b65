use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trading_dashboard::{
    config::{AppConfig, FeedArgs, StorageArgs, DEFAULT_LOG_FILTER},
    demo,
    format::{format_currency, format_percent, Trend},
    portfolio::PortfolioSummary,
    server::{self, ServerConfig},
    stock::Stock,
    tui::app::App,
    views::Route,
};

#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    storage: StorageArgs,

    #[command(flatten)]
    feed: FeedArgs,

    #[arg(long, env = "DASHBOARD_LOG_PATH", default_value = "dashboard.log")]
    log_path: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Terminal dashboard (default).
    Tui {
        /// Screen to open first.
        #[arg(long, default_value = "/dashboard")]
        route: String,
    },
    /// Demo price feed server.
    Serve {
        #[arg(long, env = "DASHBOARD_SERVER_ADDRESS", default_value = "127.0.0.1:3000")]
        address: String,
        #[arg(long, default_value = "1000")]
        tick_ms: u64,
    },
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        password: String,
    },
    Logout,
    Whoami,
    /// List, search or look up stocks.
    Stocks {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        symbol: Option<String>,
    },
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let command = args.command.unwrap_or_else(|| Commands::Tui {
        route: Route::Dashboard.path().to_string(),
    });

    match command {
        Commands::Tui { route } => {
            let log_file = std::fs::File::create(&args.log_path).with_context(|| {
                format!("Failed to create log file {}", args.log_path.display())
            })?;
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_ansi(false).with_writer(std::sync::Mutex::new(log_file)))
                .init();
            run_tui(&args.storage, &args.feed, Route::parse(&route)).await
        }
        other => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            match other {
                Commands::Serve { address, tick_ms } => run_serve(address, tick_ms).await,
                Commands::Login { username, password } => {
                    run_login(&args.storage, &username, &password)
                }
                Commands::Logout => run_logout(&args.storage),
                Commands::Whoami => run_whoami(&args.storage),
                Commands::Stocks { query, symbol } => {
                    run_stocks(&args.storage, query, symbol).await
                }
                Commands::Tui { .. } => Ok(()),
            }
        }
    }
}

async fn run_tui(storage: &StorageArgs, feed: &FeedArgs, route: Route) -> Result<()> {
    let session = storage.open_session()?;
    let catalog = Arc::new(storage.load_catalog().await?);
    let mut app = App::new(session, catalog, AppConfig::from(feed));

    let result = app.run(route).await;
    ratatui::restore();
    result
}

async fn run_serve(address: String, tick_ms: u64) -> Result<()> {
    info!("{}", "STARTING FEED SERVER".green());
    server::start(
        address,
        ServerConfig {
            tick: Duration::from_millis(tick_ms.max(1)),
            ..Default::default()
        },
    )
    .await
}

fn run_login(storage: &StorageArgs, username: &str, password: &str) -> Result<()> {
    let session = storage.open_session()?;
    if session.login(username, password)? {
        println!("Logged in as {}", username.bold());
    } else {
        println!("{}", "Login failed. Please try again.".red());
    }
    Ok(())
}

fn run_logout(storage: &StorageArgs) -> Result<()> {
    storage.open_session()?.logout()?;
    println!("Logged out");
    Ok(())
}

fn run_whoami(storage: &StorageArgs) -> Result<()> {
    let session = storage.open_session()?;
    if session.is_logged_in() {
        let summary = PortfolioSummary::from_items(&demo::portfolio());
        println!("{}  portfolio {}", session.username().bold(), summary);
    } else {
        println!("{}", "Not logged in".dimmed());
    }
    Ok(())
}

async fn run_stocks(
    storage: &StorageArgs,
    query: Option<String>,
    symbol: Option<String>,
) -> Result<()> {
    let catalog = storage.load_catalog().await?;

    if let Some(symbol) = symbol {
        match catalog.stock_by_symbol(&symbol).await {
            Some(stock) => print_stock(&stock),
            None => println!("{}", format!("No stock {symbol}").red()),
        }
        return Ok(());
    }

    let stocks = match query {
        Some(query) => catalog.search_stocks(&query).await,
        None => catalog.list_stocks().await,
    };
    for stock in stocks.iter() {
        print_stock(stock);
    }
    Ok(())
}

fn print_stock(stock: &Stock) {
    let change = format_percent(stock.change_percent);
    let change = match Trend::from(stock.change_percent) {
        Trend::Up => change.green(),
        Trend::Down => change.red(),
        Trend::Flat => change.normal(),
    };
    println!(
        "{:<12} {:<40} {:<20} {:>16} {:>8}",
        stock.symbol.blue(),
        stock.name,
        stock.sector.dimmed(),
        format_currency(stock.current_price).yellow(),
        change
    );
}
