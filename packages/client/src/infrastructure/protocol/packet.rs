//! Packet codec for the WebSocket-only subset of Engine.IO v4 and
//! Socket.IO v5.
//!
//! Every WebSocket text frame is one Engine.IO packet. Its first character is
//! the packet type. Engine.IO `message` packets carry one Socket.IO packet:
//!
//! ```text
//! <type>[<namespace>,][<ack id>][JSON data]
//! ```
//!
//! Only the default namespace `/` is used by this client. Binary packets are
//! not supported.

use serde_json::Value;
use thiserror::Error;

use crate::{error::ClientError, infrastructure::dto::socketio::OpenPayload};

/// Codec errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Empty packet")]
    Empty,

    #[error("Unknown Engine.IO packet type '{0}'")]
    UnknownEngineType(char),

    #[error("Unknown Socket.IO packet type '{0}'")]
    UnknownSocketType(char),

    #[error("Binary Socket.IO packets are not supported")]
    BinaryUnsupported,

    #[error("Packet for foreign namespace '{0}'")]
    ForeignNamespace(String),

    #[error("Invalid ack id")]
    InvalidAckId,

    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("Event packet without an event name")]
    MissingEventName,
}

impl From<PacketError> for ClientError {
    fn from(e: PacketError) -> Self {
        ClientError::Protocol(e.to_string())
    }
}

/// Engine.IO packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(OpenPayload),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO packet in the default namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event {
        name: String,
        args: Vec<Value>,
        ack_id: Option<u64>,
    },
    Ack {
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError(Option<Value>),
}

impl EnginePacket {
    /// Decode one WebSocket text frame.
    pub fn decode(frame: &str) -> Result<Self, PacketError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(PacketError::Empty)?;
        let body = chars.as_str();

        match kind {
            '0' => serde_json::from_str(body)
                .map(EnginePacket::Open)
                .map_err(|e| PacketError::InvalidJson(e.to_string())),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(body.to_string())),
            '3' => Ok(EnginePacket::Pong(body.to_string())),
            '4' => SocketPacket::decode(body).map(EnginePacket::Message),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(PacketError::UnknownEngineType(other)),
        }
    }

    /// Encode into a WebSocket text frame.
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(payload) => {
                // OpenPayload only holds strings and integers
                let json = serde_json::to_string(payload).unwrap_or_default();
                format!("0{json}")
            }
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(packet) => format!("4{}", packet.encode()),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

impl SocketPacket {
    /// Build an event packet without ack.
    pub fn event(name: &str, payload: Value) -> Self {
        SocketPacket::Event {
            name: name.to_string(),
            args: vec![payload],
            ack_id: None,
        }
    }

    /// Decode the Socket.IO part of an Engine.IO message packet.
    pub fn decode(body: &str) -> Result<Self, PacketError> {
        let mut chars = body.chars();
        let kind = chars.next().ok_or(PacketError::Empty)?;
        if matches!(kind, '5' | '6') {
            return Err(PacketError::BinaryUnsupported);
        }
        let rest = chars.as_str();

        let rest = match rest.strip_prefix('/') {
            Some(_) => {
                let (nsp, after) = rest.split_once(',').unwrap_or((rest, ""));
                if nsp != "/" {
                    return Err(PacketError::ForeignNamespace(nsp.to_string()));
                }
                after
            }
            None => rest,
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (ack, data) = rest.split_at(digits);
        let ack_id = if ack.is_empty() {
            None
        } else {
            Some(ack.parse::<u64>().map_err(|_| PacketError::InvalidAckId)?)
        };

        let data = if data.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(data)
                    .map_err(|e| PacketError::InvalidJson(e.to_string()))?,
            )
        };

        match kind {
            '0' => Ok(SocketPacket::Connect(data)),
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let mut args = match data {
                    Some(Value::Array(items)) => items,
                    _ => return Err(PacketError::MissingEventName),
                };
                if args.is_empty() {
                    return Err(PacketError::MissingEventName);
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    _ => return Err(PacketError::MissingEventName),
                };
                Ok(SocketPacket::Event { name, args, ack_id })
            }
            '3' => {
                let ack_id = ack_id.ok_or(PacketError::InvalidAckId)?;
                let args = match data {
                    Some(Value::Array(items)) => items,
                    None => Vec::new(),
                    Some(other) => vec![other],
                };
                Ok(SocketPacket::Ack { ack_id, args })
            }
            '4' => Ok(SocketPacket::ConnectError(data)),
            other => Err(PacketError::UnknownSocketType(other)),
        }
    }

    /// Encode the Socket.IO part (without the Engine.IO `4` prefix).
    pub fn encode(&self) -> String {
        match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(data)) => format!("0{data}"),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args, ack_id } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                let ack = ack_id.map(|id| id.to_string()).unwrap_or_default();
                format!("2{ack}{}", Value::Array(items))
            }
            SocketPacket::Ack { ack_id, args } => {
                format!("3{ack_id}{}", Value::Array(args.clone()))
            }
            SocketPacket::ConnectError(None) => "4".to_string(),
            SocketPacket::ConnectError(Some(data)) => format!("4{data}"),
        }
    }
}
