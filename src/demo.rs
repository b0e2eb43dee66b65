//! Fixed demo records shown on the dashboard and used to seed the demo feed server.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{
    market::MarketDataRow,
    portfolio::PortfolioItem,
    trade::{Trade, TradeSide, TradeStatus},
};

fn at(hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 12, 17)
        .and_then(|d| d.and_hms_opt(hour, min, 0))
        .unwrap_or_default()
}

pub fn recent_trades() -> Vec<Trade> {
    vec![
        Trade {
            id: "T001".to_string(),
            symbol: "DFM".to_string(),
            side: TradeSide::Buy,
            quantity: 500,
            price: dec!(12.45),
            total: dec!(6225),
            date: at(9, 30),
            status: TradeStatus::Completed,
        },
        Trade {
            id: "T002".to_string(),
            symbol: "ADX".to_string(),
            side: TradeSide::Sell,
            quantity: 300,
            price: dec!(28.90),
            total: dec!(8670),
            date: at(10, 15),
            status: TradeStatus::Completed,
        },
        Trade {
            id: "T003".to_string(),
            symbol: "EMAAR".to_string(),
            side: TradeSide::Buy,
            quantity: 250,
            price: dec!(45.60),
            total: dec!(11400),
            date: at(11, 20),
            status: TradeStatus::Completed,
        },
        Trade {
            id: "T004".to_string(),
            symbol: "TAQA".to_string(),
            side: TradeSide::Buy,
            quantity: 1000,
            price: dec!(8.75),
            total: dec!(8750),
            date: at(13, 45),
            status: TradeStatus::Pending,
        },
        Trade {
            id: "T005".to_string(),
            symbol: "ADNOC".to_string(),
            side: TradeSide::Sell,
            quantity: 400,
            price: dec!(33.20),
            total: dec!(13280),
            date: at(14, 30),
            status: TradeStatus::Completed,
        },
    ]
}

pub fn portfolio() -> Vec<PortfolioItem> {
    vec![
        PortfolioItem::new("DFM", "Dubai Financial Market", 1500, dec!(11.80), dec!(12.45)),
        PortfolioItem::new("EMAAR", "Emaar Properties", 800, dec!(44.20), dec!(45.60)),
        PortfolioItem::new("ADNOC", "ADNOC Distribution", 1200, dec!(31.50), dec!(33.20)),
        PortfolioItem::new("TAQA", "Abu Dhabi National Energy", 3000, dec!(8.50), dec!(8.75)),
    ]
}

fn row(
    symbol: &str,
    name: &str,
    price: Decimal,
    change: Decimal,
    change_percent: Decimal,
    volume: &str,
) -> MarketDataRow {
    MarketDataRow {
        symbol: symbol.to_string(),
        name: name.to_string(),
        price,
        change,
        change_percent,
        volume: volume.to_string(),
    }
}

/// Opening market rows published by the demo feed server.
pub fn market_rows() -> Vec<MarketDataRow> {
    vec![
        row("DFM", "Dubai Financial Market", dec!(12.45), dec!(0.35), dec!(2.89), "2.5M"),
        row("EMAAR", "Emaar Properties", dec!(45.60), dec!(-0.80), dec!(-1.72), "1.8M"),
        row("ADNOC", "ADNOC Distribution", dec!(33.20), dec!(1.15), dec!(3.59), "3.2M"),
        row("TAQA", "Abu Dhabi National Energy", dec!(8.75), dec!(0.12), dec!(1.39), "5.1M"),
        row("ADX", "Abu Dhabi Securities Exchange", dec!(28.90), dec!(-0.45), dec!(-1.53), "1.2M"),
    ]
}
