//! Engine.IO v4 / Socket.IO v5 text framing.

pub mod packet;

pub use packet::{EnginePacket, PacketError, SocketPacket};
