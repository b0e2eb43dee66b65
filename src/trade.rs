use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Serialize, Deserialize, Display, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Serialize, Deserialize, Display, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Completed,
    Pending,
    Cancelled,
}

/// A historical demo trade. Never changes status.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub quantity: u64,
    pub price: Decimal,
    pub total: Decimal,
    pub date: NaiveDateTime,
    pub status: TradeStatus,
}
