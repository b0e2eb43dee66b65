use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reference record for one tradable symbol, as stored in the bundled data file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Stock {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub market: String,
    pub sector: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub change_percent: Decimal,
    pub volume: u64,
    pub market_cap: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// Case-insensitive substring match on symbol or name.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.symbol.to_lowercase().contains(&needle) || self.name.to_lowercase().contains(&needle)
    }

    /// Same as [`Stock::matches`] but also looks at the sector.
    pub fn matches_with_sector(&self, needle: &str) -> bool {
        self.matches(needle) || self.sector.to_lowercase().contains(&needle.to_lowercase())
    }
}
