use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl From<Decimal> for Trend {
    fn from(value: Decimal) -> Self {
        if value > dec!(0) {
            Trend::Up
        } else if value < dec!(0) {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

/// `AED 12,345.60`, two decimals, negatives as `-AED 1.00`.
pub fn format_currency(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{sign}AED {}.{frac_part}", group_thousands(int_part))
}

/// `+2.89%`, `-1.72%`, `0.00%`.
pub fn format_percent(value: Decimal) -> String {
    let sign = if value > dec!(0) { "+" } else { "" };
    format!("{sign}{:.2}%", value.round_dp(2))
}

/// `Dec 17, 09:30 AM`.
pub fn format_date(date: &NaiveDateTime) -> String {
    date.format("%b %-d, %I:%M %p").to_string()
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(dec!(12.45)), "AED 12.45");
        assert_eq!(format_currency(dec!(6225)), "AED 6,225.00");
        assert_eq!(format_currency(dec!(1234567.891)), "AED 1,234,567.89");
        assert_eq!(format_currency(dec!(-1120)), "-AED 1,120.00");
        assert_eq!(format_currency(dec!(0)), "AED 0.00");
        assert_eq!(format_currency(dec!(-0.001)), "AED 0.00");
        assert_eq!(format_currency(dec!(999)), "AED 999.00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(dec!(2.89)), "+2.89%");
        assert_eq!(format_percent(dec!(-1.72)), "-1.72%");
        assert_eq!(format_percent(dec!(0)), "0.00%");
        assert_eq!(format_percent(dec!(3.1)), "+3.10%");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 17)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(format_date(&date), "Dec 17, 09:30 AM");
        let date = NaiveDate::from_ymd_opt(2025, 12, 7)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(format_date(&date), "Dec 7, 02:05 PM");
    }

    #[test]
    fn test_trend() {
        assert_eq!(Trend::from(dec!(0.01)), Trend::Up);
        assert_eq!(Trend::from(dec!(-3)), Trend::Down);
        assert_eq!(Trend::from(dec!(0)), Trend::Flat);
    }
}
