//! Socket.IO v4 framing over the Engine.IO v4 WebSocket transport.
//!
//! Every WebSocket text frame carries one Engine.IO packet: a single digit
//! type followed by an optional payload. Engine.IO `message` packets in turn
//! carry a Socket.IO packet (`2["event",{...}]`, `0` connect, ...).

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_NAMESPACE: &str = "/";

/// Handshake sent by the server when the transport opens.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenPacket {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl OpenPacket {
    /// Longest silence allowed before the connection counts as dead.
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EnginePacket {
    Open(OpenPacket),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars.next().context("Empty engine packet")?;
        let payload = chars.as_str();
        let packet = match kind {
            '0' => EnginePacket::Open(
                serde_json::from_str(payload).context("Invalid open handshake")?,
            ),
            '1' => EnginePacket::Close,
            '2' => EnginePacket::Ping(payload.to_string()),
            '3' => EnginePacket::Pong(payload.to_string()),
            '4' => EnginePacket::Message(payload.to_string()),
            '5' => EnginePacket::Upgrade,
            '6' => EnginePacket::Noop,
            other => bail!("Unknown engine packet type {:?}", other),
        };
        Ok(packet)
    }

    pub fn encode(&self) -> Result<String> {
        let frame = match self {
            EnginePacket::Open(open) => format!("0{}", serde_json::to_string(open)?),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(data) => format!("4{data}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        };
        Ok(frame)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Value,
    },
}

impl SocketPacket {
    pub fn connect() -> Self {
        SocketPacket::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data: None,
        }
    }

    pub fn event(name: &str, payload: Value) -> Self {
        SocketPacket::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            id: None,
            name: name.to_string(),
            args: vec![payload],
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::Ack { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. } => namespace,
        }
    }

    pub fn decode(message: &str) -> Result<Self> {
        let mut chars = message.chars();
        let kind = chars.next().context("Empty socket packet")?;
        let mut rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            bail!("Binary socket packets are not supported");
        }

        let mut namespace = DEFAULT_NAMESPACE.to_string();
        if rest.starts_with('/') {
            match rest.split_once(',') {
                Some((nsp, tail)) => {
                    namespace = nsp.to_string();
                    rest = tail;
                }
                None => {
                    namespace = rest.to_string();
                    rest = "";
                }
            }
        }

        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        let id = if digits > 0 {
            Some(rest[..digits].parse::<u64>()?)
        } else {
            None
        };
        rest = &rest[digits..];

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(rest).context("Invalid socket packet payload")?)
        };

        let packet = match kind {
            '0' => SocketPacket::Connect { namespace, data },
            '1' => SocketPacket::Disconnect { namespace },
            '2' => {
                let mut args = match data {
                    Some(Value::Array(args)) => args,
                    _ => bail!("Event packet without an argument array"),
                };
                if args.is_empty() {
                    bail!("Event packet without a name");
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => bail!("Event name must be a string, got {}", other),
                };
                SocketPacket::Event {
                    namespace,
                    id,
                    name,
                    args,
                }
            }
            '3' => {
                let id = id.context("Ack packet without an id")?;
                let args = match data {
                    Some(Value::Array(args)) => args,
                    None => vec![],
                    Some(other) => vec![other],
                };
                SocketPacket::Ack {
                    namespace,
                    id,
                    args,
                }
            }
            '4' => SocketPacket::ConnectError {
                namespace,
                data: data.unwrap_or(Value::Null),
            },
            other => bail!("Unknown socket packet type {:?}", other),
        };
        Ok(packet)
    }

    pub fn encode(&self) -> Result<String> {
        let (kind, id, data) = match self {
            SocketPacket::Connect { data, .. } => ('0', None, data.clone()),
            SocketPacket::Disconnect { .. } => ('1', None, None),
            SocketPacket::Event { id, name, args, .. } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                ('2', *id, Some(Value::Array(array)))
            }
            SocketPacket::Ack { id, args, .. } => {
                ('3', Some(*id), Some(Value::Array(args.clone())))
            }
            SocketPacket::ConnectError { data, .. } => ('4', None, Some(data.clone())),
        };

        let mut out = String::new();
        out.push(kind);
        if self.namespace() != DEFAULT_NAMESPACE {
            out.push_str(self.namespace());
            out.push(',');
        }
        if let Some(id) = id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = data {
            out.push_str(&serde_json::to_string(&data)?);
        }
        Ok(out)
    }

    /// The full WebSocket frame: this packet wrapped in an engine `message`.
    pub fn to_frame(&self) -> Result<String> {
        EnginePacket::Message(self.encode()?).encode()
    }
}

/// Turns `http://host:port` into the Engine.IO WebSocket endpoint.
pub fn socket_url(base: &str) -> Result<String> {
    let base = base.trim_end_matches('/');
    let (scheme, host) = base
        .split_once("://")
        .with_context(|| format!("Missing scheme in feed url {base}"))?;
    let scheme = match scheme {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => bail!("Unsupported feed url scheme {other}"),
    };
    if host.is_empty() {
        bail!("Missing host in feed url {base}");
    }
    Ok(format!("{scheme}://{host}/socket.io/?EIO=4&transport=websocket"))
}
