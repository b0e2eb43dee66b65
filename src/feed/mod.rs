use anyhow::{Context, Result};
use serde_json::Value;

use crate::market::{MarketDataRow, PriceUpdate};

pub mod backoff;
pub mod client;
pub mod protocol;
pub mod table;

pub use backoff::ReconnectConfig;
pub use client::{FeedClient, FeedHandle};
pub use table::MarketTable;

pub const SNAPSHOT_EVENT: &str = "market:snapshot";
pub const UPDATE_EVENT: &str = "market:update";

/// Market data received from the price feed.
#[derive(Clone, Debug, PartialEq)]
pub enum FeedEvent {
    Snapshot(Vec<MarketDataRow>),
    Update(PriceUpdate),
}

impl FeedEvent {
    /// Maps a named socket event to a feed event. Unrelated events yield `None`.
    pub fn from_socket_event(name: &str, mut args: Vec<Value>) -> Result<Option<Self>> {
        if name != SNAPSHOT_EVENT && name != UPDATE_EVENT {
            return Ok(None);
        }
        let payload = if args.is_empty() {
            Value::Null
        } else {
            args.swap_remove(0)
        };
        let event = match name {
            SNAPSHOT_EVENT => FeedEvent::Snapshot(
                serde_json::from_value(payload).context("Invalid snapshot payload")?,
            ),
            _ => FeedEvent::Update(
                serde_json::from_value(payload).context("Invalid update payload")?,
            ),
        };
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_snapshot_event() {
        let event = FeedEvent::from_socket_event(
            SNAPSHOT_EVENT,
            vec![json!([
                {"symbol":"DFM","name":"Dubai Financial Market","price":12.45,"change":0.35,"changePercent":2.89,"volume":"2.5M"},
                {"symbol":"ADX","name":"Abu Dhabi Securities Exchange","price":28.9,"change":-0.45,"changePercent":-1.53,"volume":"1.2M"}
            ])],
        )
        .unwrap();
        match event {
            Some(FeedEvent::Snapshot(rows)) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1].change, dec!(-0.45));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_update_event() {
        let event = FeedEvent::from_socket_event(
            UPDATE_EVENT,
            vec![json!({"symbol":"DFM","price":12.6,"changePercent":3.1})],
        )
        .unwrap();
        assert_eq!(
            event,
            Some(FeedEvent::Update(PriceUpdate {
                symbol: "DFM".to_string(),
                price: dec!(12.60),
                change_percent: dec!(3.10),
            }))
        );
    }

    #[test]
    fn test_other_events_ignored() {
        assert_eq!(FeedEvent::from_socket_event("chat", vec![json!("hi")]).unwrap(), None);
    }

    #[test]
    fn test_malformed_payload() {
        assert!(FeedEvent::from_socket_event(UPDATE_EVENT, vec![json!({"symbol":"DFM"})]).is_err());
        assert!(FeedEvent::from_socket_event(SNAPSHOT_EVENT, vec![]).is_err());
    }
}
