use std::time::Duration;

use anyhow::{bail, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    select,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info};
use tungstenite::Message;

use super::{
    backoff::{Backoff, ReconnectConfig},
    protocol::{socket_url, EnginePacket, SocketPacket},
    FeedEvent,
};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum SessionEnd {
    Disconnected,
    ReceiverClosed,
}

/// Consumes the price feed. Never emits application events of its own.
#[derive(Clone, Debug)]
pub struct FeedClient {
    url: String,
    reconnect: ReconnectConfig,
}

impl FeedClient {
    pub fn new(base_url: &str, reconnect: ReconnectConfig) -> Result<Self> {
        Ok(Self {
            url: socket_url(base_url)?,
            reconnect,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Starts the connection task. Events arrive on the returned handle.
    pub fn spawn(self) -> FeedHandle {
        let (tx, rx) = mpsc::channel::<FeedEvent>(100);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::task::spawn(async move {
            select! {
                _ = self.run(tx) => {}
                _ = shutdown_rx => {
                    info!("Feed connection closed");
                }
            }
        });

        FeedHandle {
            rx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn run(&self, tx: mpsc::Sender<FeedEvent>) {
        let mut backoff = Backoff::new(self.reconnect.clone());

        loop {
            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    info!("Connected to {}", self.url);
                    match self.listen(stream, &tx, &mut backoff).await {
                        Ok(SessionEnd::ReceiverClosed) => return,
                        Ok(SessionEnd::Disconnected) => info!("Feed disconnected"),
                        Err(err) => error!("Feed error: {:#}", err),
                    }
                }
                Err(err) => {
                    error!("Socket connect error: {}", err);
                }
            }

            match backoff.next_delay() {
                Some(delay) => {
                    debug!("Reconnecting in {:?} (attempt {})", delay, backoff.attempt());
                    tokio::time::sleep(delay).await;
                }
                None => return,
            }
        }
    }

    async fn listen(
        &self,
        stream: Stream,
        tx: &mpsc::Sender<FeedEvent>,
        backoff: &mut Backoff,
    ) -> Result<SessionEnd> {
        let (mut write, mut read) = stream.split();
        // set by the open handshake
        let mut heartbeat: Option<Duration> = None;

        loop {
            let next = match heartbeat {
                Some(limit) => match tokio::time::timeout(limit, read.next()).await {
                    Ok(next) => next,
                    Err(_) => bail!("No heartbeat within {:?}", limit),
                },
                None => read.next().await,
            };

            let text = match next {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Ping(data))) => {
                    write.send(Message::Pong(data)).await?;
                    continue;
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("Stream closed: {:?}", frame);
                    return Ok(SessionEnd::Disconnected);
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(SessionEnd::Disconnected),
            };

            match EnginePacket::decode(text.as_str())? {
                EnginePacket::Open(open) => {
                    debug!("Engine session {} opened", open.sid);
                    heartbeat = Some(open.heartbeat());
                    let frame = SocketPacket::connect().to_frame()?;
                    write.send(Message::Text(frame.into())).await?;
                }
                EnginePacket::Ping(data) => {
                    let frame = EnginePacket::Pong(data).encode()?;
                    write.send(Message::Text(frame.into())).await?;
                }
                EnginePacket::Close => return Ok(SessionEnd::Disconnected),
                EnginePacket::Message(message) => match SocketPacket::decode(&message) {
                    Ok(SocketPacket::Connect { .. }) => {
                        info!("Subscribed to market feed");
                        backoff.reset();
                    }
                    Ok(SocketPacket::Disconnect { .. }) => {
                        return Ok(SessionEnd::Disconnected);
                    }
                    Ok(SocketPacket::ConnectError { data, .. }) => {
                        bail!("Socket connect error: {}", data);
                    }
                    Ok(SocketPacket::Event { name, args, .. }) => {
                        match FeedEvent::from_socket_event(&name, args) {
                            Ok(Some(event)) => {
                                if tx.send(event).await.is_err() {
                                    return Ok(SessionEnd::ReceiverClosed);
                                }
                            }
                            Ok(None) => debug!("Ignoring event {}", name),
                            Err(err) => error!("Invalid {} event: {:#}", name, err),
                        }
                    }
                    Ok(SocketPacket::Ack { .. }) => {}
                    Err(err) => error!("Malformed socket packet: {:#}", err),
                },
                EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
            }
        }
    }
}

/// Owner side of a running feed connection. Dropping it stops the connection.
#[derive(Debug)]
pub struct FeedHandle {
    rx: mpsc::Receiver<FeedEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.rx.recv().await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
