use std::time::Duration;

use tokio::net::TcpListener;
use trading_dashboard::{
    demo,
    feed::{FeedClient, FeedEvent, MarketTable, ReconnectConfig},
    server::{self, ServerConfig},
};

async fn start_server(tick: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::task::spawn(async move {
        let config = ServerConfig {
            tick,
            ..Default::default()
        };
        server::serve(listener, config).await.unwrap();
    });
    format!("http://{address}")
}

#[tokio::test]
async fn test_client_receives_snapshot_then_updates() {
    let url = start_server(Duration::from_millis(20)).await;
    let mut feed = FeedClient::new(&url, ReconnectConfig::default())
        .unwrap()
        .spawn();

    let first = tokio::time::timeout(Duration::from_secs(5), feed.recv())
        .await
        .unwrap()
        .unwrap();
    let FeedEvent::Snapshot(rows) = first.clone() else {
        panic!("expected a snapshot first, got {:?}", first);
    };
    assert_eq!(rows.len(), 5);
    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["DFM", "EMAAR", "ADNOC", "TAQA", "ADX"]);

    let mut table = MarketTable::new();
    table.apply(first);

    let mut updates = 0;
    while updates < 3 {
        let event = tokio::time::timeout(Duration::from_secs(5), feed.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            FeedEvent::Update(update) => {
                assert!(table.apply(FeedEvent::Update(update.clone())));
                let row = table.get(&update.symbol).unwrap();
                assert_eq!(row.price, update.price);
                assert_eq!(row.change_percent, update.change_percent);
                updates += 1;
            }
            FeedEvent::Snapshot(_) => panic!("unexpected second snapshot"),
        }
    }
    assert_eq!(table.len(), demo::market_rows().len());

    tokio::time::timeout(Duration::from_secs(5), feed.close())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_client_waits_for_late_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let mut feed = FeedClient::new(
        &format!("http://{address}"),
        ReconnectConfig {
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(50),
            jitter: 0.0,
            ..Default::default()
        },
    )
    .unwrap()
    .spawn();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let listener = TcpListener::bind(address).await.unwrap();
    tokio::task::spawn(async move {
        server::serve(listener, ServerConfig::default()).await.unwrap();
    });

    let event = tokio::time::timeout(Duration::from_secs(5), feed.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, FeedEvent::Snapshot(rows) if rows.len() == 5));
}
