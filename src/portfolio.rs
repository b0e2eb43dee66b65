use colored::Colorize;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    pub symbol: String,
    pub name: String,
    pub quantity: u64,
    pub avg_price: Decimal,
    pub current_price: Decimal,
    pub total_value: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_percent: Decimal,
}

impl PortfolioItem {
    /// Holding valued at `current_price`, with profit/loss against `avg_price`.
    pub fn new(
        symbol: &str,
        name: &str,
        quantity: u64,
        avg_price: Decimal,
        current_price: Decimal,
    ) -> Self {
        let quantity_dec = Decimal::from(quantity);
        let cost = avg_price * quantity_dec;
        let total_value = current_price * quantity_dec;
        let profit_loss = total_value - cost;
        let profit_loss_percent = if cost.is_zero() {
            dec!(0)
        } else {
            (profit_loss / cost * dec!(100)).round_dp(2)
        };
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            quantity,
            avg_price,
            current_price,
            total_value,
            profit_loss,
            profit_loss_percent,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PortfolioSummary {
    pub total_value: Decimal,
    pub total_profit_loss: Decimal,
}

impl PortfolioSummary {
    pub fn from_items(items: &[PortfolioItem]) -> Self {
        items.iter().fold(Self::default(), |acc, item| Self {
            total_value: acc.total_value + item.total_value,
            total_profit_loss: acc.total_profit_loss + item.profit_loss,
        })
    }

    /// Profit/loss relative to the cost basis, in percent.
    pub fn profit_loss_percent(&self) -> Decimal {
        let cost = self.total_value - self.total_profit_loss;
        if cost.is_zero() {
            return dec!(0);
        }
        (self.total_profit_loss / cost * dec!(100)).round_dp(2)
    }
}

impl Display for PortfolioSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pl = self.total_profit_loss.round_dp(2).to_string();
        let pl = if self.total_profit_loss.is_sign_negative() {
            pl.red()
        } else {
            pl.green()
        };
        write!(
            f,
            "~{} : {} ({}%)",
            self.total_value.round_dp(2).to_string().yellow(),
            pl,
            self.profit_loss_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;

    #[test]
    fn test_summary_display() {
        colored::control::set_override(false);
        let summary = PortfolioSummary::from_items(&demo::portfolio());
        assert_eq!(summary.to_string(), "~121245.00 : 4885.00 (4.20%)");
    }

    #[test]
    fn test_item_derives_value_and_profit() {
        let item = PortfolioItem::new("EMAAR", "Emaar Properties", 800, dec!(44.20), dec!(45.60));
        assert_eq!(item.total_value, dec!(36480));
        assert_eq!(item.profit_loss, dec!(1120));
        assert_eq!(item.profit_loss_percent, dec!(3.17));
    }

    #[test]
    fn test_summary() {
        let summary = PortfolioSummary::from_items(&demo::portfolio());
        assert_eq!(summary.total_value, dec!(121245));
        assert_eq!(summary.total_profit_loss, dec!(4885));
        assert_eq!(summary.profit_loss_percent(), dec!(4.20));
    }

    #[test]
    fn test_empty_summary() {
        let summary = PortfolioSummary::from_items(&[]);
        assert_eq!(summary.total_value, dec!(0));
        assert_eq!(summary.profit_loss_percent(), dec!(0));
    }
}
