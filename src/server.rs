//! Demo price feed speaking the same socket protocol the dashboard consumes.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::any,
    Router,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use tokio::{
    net::TcpListener,
    select,
    sync::{broadcast::Sender, RwLock},
};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, trace};

use crate::{
    demo,
    feed::{
        protocol::{EnginePacket, OpenPacket, SocketPacket},
        SNAPSHOT_EVENT, UPDATE_EVENT,
    },
    market::{MarketDataRow, PriceUpdate},
};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Time between two price updates.
    pub tick: Duration,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1000),
            ping_interval: Duration::from_secs(25),
            ping_timeout: Duration::from_secs(20),
        }
    }
}

/// Current rows plus the price each symbol opened at.
#[derive(Debug)]
pub struct Market {
    rows: Vec<MarketDataRow>,
    open_prices: Vec<Decimal>,
}

impl Market {
    pub fn new(rows: Vec<MarketDataRow>) -> Self {
        let open_prices = rows.iter().map(|row| row.price - row.change).collect();
        Self { rows, open_prices }
    }

    pub fn rows(&self) -> &[MarketDataRow] {
        &self.rows
    }

    /// Moves one row's price by `bps` basis points and returns the resulting update.
    pub fn step(&mut self, index: usize, bps: i64) -> Option<PriceUpdate> {
        let row = self.rows.get_mut(index)?;
        let open = *self.open_prices.get(index)?;

        let price = (row.price + row.price * Decimal::new(bps, 4)).round_dp(2);
        row.price = price.max(dec!(0.01));
        row.change = row.price - open;
        row.change_percent = if open.is_zero() {
            dec!(0)
        } else {
            (row.change / open * dec!(100)).round_dp(2)
        };

        Some(PriceUpdate {
            symbol: row.symbol.clone(),
            price: row.price,
            change_percent: row.change_percent,
        })
    }
}

struct ServerState {
    config: ServerConfig,
    market: Arc<RwLock<Market>>,
    updates_tx: Sender<PriceUpdate>,
}

type SharedServerState = Arc<ServerState>;

pub async fn start(address: String, config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Feed server listening on {}", listener.local_addr()?);
    serve(listener, config).await
}

pub async fn serve(listener: TcpListener, config: ServerConfig) -> Result<()> {
    let market = Arc::new(RwLock::new(Market::new(demo::market_rows())));
    let (updates_tx, _) = tokio::sync::broadcast::channel::<PriceUpdate>(1000);

    tokio::task::spawn({
        let market = market.clone();
        let updates_tx = updates_tx.clone();
        let tick = config.tick;
        async move { run_ticker(market, updates_tx, tick).await }
    });

    let state = Arc::new(ServerState {
        config,
        market,
        updates_tx,
    });

    let app = Router::new()
        .route("/socket.io/", any(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn run_ticker(market: Arc<RwLock<Market>>, updates_tx: Sender<PriceUpdate>, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    loop {
        interval.tick().await;
        let update = {
            let mut market = market.write().await;
            let len = market.rows().len();
            if len == 0 {
                continue;
            }
            let index = rand::random_range(0..len);
            let bps = rand::random_range(-50..=50);
            market.step(index, bps)
        };
        if let Some(update) = update {
            trace!("{} -> {}", update.symbol, update.price);
            // no subscribers is fine
            let _ = updates_tx.send(update);
        }
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedServerState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedServerState) {
    if let Err(err) = run_socket(socket, state).await {
        error!("Feed socket error: {:#}", err);
    }
}

async fn run_socket(socket: WebSocket, state: SharedServerState) -> Result<()> {
    let (mut sender, mut receiver) = socket.split();
    let sid = uuid::Uuid::new_v4().simple().to_string();

    let open = EnginePacket::Open(OpenPacket {
        sid: sid.clone(),
        upgrades: vec![],
        ping_interval: state.config.ping_interval.as_millis() as u64,
        ping_timeout: state.config.ping_timeout.as_millis() as u64,
        max_payload: Some(1_000_000),
    });
    sender.send(Message::Text(open.encode()?.into())).await?;

    // wait for the namespace connect
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                if let Ok(EnginePacket::Message(message)) = EnginePacket::decode(text.as_str()) {
                    if let Ok(SocketPacket::Connect { .. }) = SocketPacket::decode(&message) {
                        break;
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => return Ok(()),
            Some(Ok(_)) => {}
            Some(Err(err)) => return Err(err.into()),
        }
    }

    let connected = SocketPacket::Connect {
        namespace: "/".to_string(),
        data: Some(json!({ "sid": sid })),
    };
    sender.send(Message::Text(connected.to_frame()?.into())).await?;
    info!("Client {} subscribed", sid);

    let mut updates_rx = state.updates_tx.subscribe();
    let snapshot = {
        let market = state.market.read().await;
        serde_json::to_value(market.rows())?
    };
    let frame = SocketPacket::event(SNAPSHOT_EVENT, snapshot).to_frame()?;
    sender.send(Message::Text(frame.into())).await?;

    let ping_interval = state.config.ping_interval;
    let mut send_task = tokio::task::spawn(async move {
        let mut ping = tokio::time::interval(ping_interval);
        ping.tick().await;
        loop {
            let frame = select! {
                update = updates_rx.recv() => match update {
                    Ok(update) => match serde_json::to_value(&update)
                        .map_err(anyhow::Error::from)
                        .and_then(|payload| SocketPacket::event(UPDATE_EVENT, payload).to_frame())
                    {
                        Ok(frame) => frame,
                        Err(err) => {
                            error!("Failed to encode update: {:#}", err);
                            continue;
                        }
                    },
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Client lagging, skipped {} updates", skipped);
                        continue;
                    }
                    Err(_) => return,
                },
                _ = ping.tick() => "2".to_string(),
            };
            if sender.send(Message::Text(frame.into())).await.is_err() {
                return;
            }
        }
    });

    let mut recv_task = tokio::task::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match EnginePacket::decode(text.as_str()) {
                    Ok(EnginePacket::Close) => return,
                    Ok(EnginePacket::Message(message))
                        if matches!(
                            SocketPacket::decode(&message),
                            Ok(SocketPacket::Disconnect { .. })
                        ) =>
                    {
                        return
                    }
                    Ok(packet) => trace!("Received {:?}", packet),
                    Err(err) => debug!("Ignoring frame: {:#}", err),
                },
                Message::Close(_) => return,
                _ => {}
            }
        }
    });

    select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }
    info!("Client {} left", sid);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_recomputes_change() {
        let mut market = Market::new(demo::market_rows());
        // DFM opened at 12.10
        let update = market.step(0, 100).unwrap();
        assert_eq!(update.symbol, "DFM");
        assert_eq!(update.price, dec!(12.57));
        let row = &market.rows()[0];
        assert_eq!(row.change, dec!(0.47));
        assert_eq!(update.change_percent, dec!(3.88));
        assert_eq!(row.change_percent, update.change_percent);
        assert_eq!(row.volume, "2.5M");
    }

    #[test]
    fn test_step_out_of_range() {
        let mut market = Market::new(demo::market_rows());
        assert!(market.step(99, 10).is_none());
    }

    #[test]
    fn test_price_stays_positive() {
        let mut market = Market::new(demo::market_rows());
        for _ in 0..2000 {
            market.step(3, -50);
        }
        assert!(market.rows()[3].price >= dec!(0.01));
    }
}
