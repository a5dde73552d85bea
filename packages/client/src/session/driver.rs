//! Background task that owns the transport of a session channel.
//!
//! The driver connects, performs the Socket.IO handshake with the token,
//! then multiplexes the outbox, server frames, heartbeat deadline and the
//! close signal. Unexpected disconnects lead to `Reconnecting` and another
//! attempt with the same token after a backoff delay.

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::{
    sync::watch,
    time::{Instant, sleep, sleep_until, timeout},
};

use super::{
    channel::Shared,
    subscription::{SessionEvent, StopReason},
};
use crate::{
    domain::{ConnectionState, InboundMessage, Token},
    error::ClientError,
    infrastructure::{
        dto::socketio::{
            ConnectErrorPayload, HandshakeAuth, NewMessagePayload, OpenPayload,
            RateLimitedPayload, event,
        },
        protocol::{EnginePacket, PacketError, SocketPacket},
        transport::{Connector, Transport},
    },
};

/// How one connection ended.
#[derive(Debug)]
enum SessionEnd {
    /// The owner closed the channel
    Closed,
    /// The connection broke or could not be established
    Lost(ClientError),
    /// The server refused the token
    Rejected(String),
    /// The server disconnected us on purpose
    ServerDisconnect,
}

/// What woke the serve loop.
enum Wake {
    Closed,
    Outbox,
    HeartbeatExpired,
    Frame(Option<Result<String, ClientError>>),
}

pub(super) async fn run(shared: Arc<Shared>, token: Token, connector: Arc<dyn Connector>) {
    let mut closed = shared.watch();
    let policy = shared.config.reconnect;
    let mut attempt: u32 = 0;

    tracing::debug!(url = %shared.config.socket_url, "Session driver started");

    loop {
        if shared.is_closed() {
            break;
        }

        let end = match open_session(&shared, &token, connector.as_ref(), &mut closed).await {
            Ok(Some((transport, open))) => {
                attempt = 0;
                shared.transition(ConnectionState::Connected);
                tracing::info!(sid = %open.sid, "Session connected");
                serve(&shared, transport, &open, &mut closed).await
            }
            Ok(None) => SessionEnd::Closed,
            Err(end) => end,
        };

        match end {
            SessionEnd::Closed => break,
            SessionEnd::Rejected(reason) => {
                shared.stop(StopReason::Rejected(reason));
                break;
            }
            SessionEnd::ServerDisconnect => {
                shared.stop(StopReason::ServerDisconnect);
                break;
            }
            SessionEnd::Lost(err) => {
                attempt = attempt.saturating_add(1);
                if !policy.allows(attempt) {
                    shared.stop(StopReason::ReconnectExhausted {
                        attempts: attempt - 1,
                    });
                    break;
                }
                let delay = policy.delay_for(attempt);
                tracing::warn!(attempt, ?delay, "Connection lost: {}", err);
                shared.transition(ConnectionState::Reconnecting { attempt });

                tokio::select! {
                    biased;
                    _ = wait_closed(&mut closed) => break,
                    _ = sleep(delay) => {}
                }
            }
        }
    }

    tracing::debug!("Session driver stopped");
}

async fn wait_closed(closed: &mut watch::Receiver<ConnectionState>) {
    let _ = closed.wait_for(|state| state.is_closed()).await;
}

/// Connect and authenticate, bounded by the handshake timeout.
///
/// `Ok(None)` means the channel was closed meanwhile.
async fn open_session(
    shared: &Shared,
    token: &Token,
    connector: &dyn Connector,
    closed: &mut watch::Receiver<ConnectionState>,
) -> Result<Option<(Box<dyn Transport>, OpenPayload)>, SessionEnd> {
    let limit = shared.config.handshake_timeout;
    tokio::select! {
        biased;
        _ = wait_closed(closed) => Ok(None),
        result = timeout(limit, handshake(shared, token, connector)) => match result {
            Ok(session) => session.map(Some),
            Err(_) => Err(SessionEnd::Lost(ClientError::Transport(format!(
                "handshake timed out after {limit:?}"
            )))),
        },
    }
}

async fn handshake(
    shared: &Shared,
    token: &Token,
    connector: &dyn Connector,
) -> Result<(Box<dyn Transport>, OpenPayload), SessionEnd> {
    let mut transport = connector
        .connect(shared.config.socket_url.as_str())
        .await
        .map_err(SessionEnd::Lost)?;

    let open = match next_packet(transport.as_mut()).await? {
        EnginePacket::Open(open) => open,
        other => {
            transport.close().await;
            return Err(SessionEnd::Lost(ClientError::Protocol(format!(
                "expected open packet, got {other:?}"
            ))));
        }
    };
    tracing::debug!(
        sid = %open.sid,
        ping_interval = open.ping_interval,
        ping_timeout = open.ping_timeout,
        "Engine.IO session opened"
    );

    let auth = serde_json::to_value(HandshakeAuth {
        token: token.as_str().to_string(),
    })
    .map_err(|e| SessionEnd::Lost(ClientError::Protocol(e.to_string())))?;
    let connect = EnginePacket::Message(SocketPacket::Connect(Some(auth)));
    send_packet(transport.as_mut(), &connect)
        .await
        .map_err(SessionEnd::Lost)?;

    loop {
        match next_packet(transport.as_mut()).await? {
            EnginePacket::Ping(data) => {
                send_packet(transport.as_mut(), &EnginePacket::Pong(data))
                    .await
                    .map_err(SessionEnd::Lost)?;
            }
            EnginePacket::Message(SocketPacket::Connect(_)) => return Ok((transport, open)),
            EnginePacket::Message(SocketPacket::ConnectError(data)) => {
                transport.close().await;
                return Err(SessionEnd::Rejected(rejection_reason(data)));
            }
            EnginePacket::Close => {
                return Err(SessionEnd::Lost(ClientError::Transport(
                    "server closed the connection during handshake".into(),
                )));
            }
            other => tracing::debug!("Ignoring {:?} during handshake", other),
        }
    }
}

fn rejection_reason(data: Option<Value>) -> String {
    data.and_then(|value| serde_json::from_value::<ConnectErrorPayload>(value).ok())
        .and_then(|payload| payload.message)
        .unwrap_or_else(|| "connection refused".to_string())
}

/// Next decodable packet during the handshake.
async fn next_packet(transport: &mut dyn Transport) -> Result<EnginePacket, SessionEnd> {
    loop {
        let frame = match transport.recv().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(SessionEnd::Lost(e)),
            None => {
                return Err(SessionEnd::Lost(ClientError::Transport(
                    "connection closed during handshake".into(),
                )));
            }
        };
        match EnginePacket::decode(&frame) {
            Ok(packet) => return Ok(packet),
            Err(PacketError::ForeignNamespace(nsp)) => {
                tracing::debug!("Ignoring packet for namespace '{}'", nsp);
            }
            Err(e) => return Err(SessionEnd::Lost(e.into())),
        }
    }
}

async fn send_packet(
    transport: &mut dyn Transport,
    packet: &EnginePacket,
) -> Result<(), ClientError> {
    transport.send(packet.encode()).await
}

/// Run an established connection until it ends.
async fn serve(
    shared: &Shared,
    mut transport: Box<dyn Transport>,
    open: &OpenPayload,
    closed: &mut watch::Receiver<ConnectionState>,
) -> SessionEnd {
    let heartbeat = Duration::from_millis(open.ping_interval.saturating_add(open.ping_timeout));
    let mut deadline = Instant::now() + heartbeat;

    loop {
        if let Err(e) = flush(shared, transport.as_mut()).await {
            return SessionEnd::Lost(e);
        }

        let wake = tokio::select! {
            biased;
            _ = wait_closed(closed) => Wake::Closed,
            _ = shared.outbox_ready.notified() => Wake::Outbox,
            _ = sleep_until(deadline) => Wake::HeartbeatExpired,
            frame = transport.recv() => Wake::Frame(frame),
        };

        match wake {
            Wake::Closed => {
                let _ = send_packet(
                    transport.as_mut(),
                    &EnginePacket::Message(SocketPacket::Disconnect),
                )
                .await;
                transport.close().await;
                return SessionEnd::Closed;
            }
            Wake::Outbox => {}
            Wake::HeartbeatExpired => {
                transport.close().await;
                return SessionEnd::Lost(ClientError::Transport(format!(
                    "no data from server for {heartbeat:?}"
                )));
            }
            Wake::Frame(None) => {
                return SessionEnd::Lost(ClientError::Transport(
                    "connection closed by server".into(),
                ));
            }
            Wake::Frame(Some(Err(e))) => return SessionEnd::Lost(e),
            Wake::Frame(Some(Ok(frame))) => {
                deadline = Instant::now() + heartbeat;
                if let Some(end) = handle_frame(shared, transport.as_mut(), &frame).await {
                    return end;
                }
            }
        }
    }
}

/// Write pending outbox frames in order.
///
/// A frame leaves the outbox only once the transport accepted it.
async fn flush(shared: &Shared, transport: &mut dyn Transport) -> Result<(), ClientError> {
    while !shared.is_closed() {
        let Some(frame) = shared.peek_outbound() else {
            break;
        };
        transport.send(frame).await?;
        shared.ack_outbound();
    }
    Ok(())
}

async fn handle_frame(
    shared: &Shared,
    transport: &mut dyn Transport,
    frame: &str,
) -> Option<SessionEnd> {
    let packet = match EnginePacket::decode(frame) {
        Ok(packet) => packet,
        Err(PacketError::ForeignNamespace(nsp)) => {
            tracing::debug!("Ignoring packet for namespace '{}'", nsp);
            return None;
        }
        Err(e) => {
            tracing::warn!(%e, "Dropping malformed frame");
            return None;
        }
    };

    match packet {
        EnginePacket::Ping(data) => {
            if let Err(e) = send_packet(transport, &EnginePacket::Pong(data)).await {
                return Some(SessionEnd::Lost(e));
            }
        }
        EnginePacket::Close => {
            return Some(SessionEnd::Lost(ClientError::Transport(
                "server closed the Engine.IO session".into(),
            )));
        }
        EnginePacket::Message(SocketPacket::Disconnect) => {
            transport.close().await;
            return Some(SessionEnd::ServerDisconnect);
        }
        EnginePacket::Message(SocketPacket::Event { name, args, .. }) => {
            on_event(shared, &name, args);
        }
        other => tracing::debug!("Ignoring {:?}", other),
    }
    None
}

fn on_event(shared: &Shared, name: &str, mut args: Vec<Value>) {
    let payload = if args.is_empty() {
        Value::Null
    } else {
        args.swap_remove(0)
    };

    match name {
        event::NEW_MESSAGE => match serde_json::from_value::<NewMessagePayload>(payload) {
            Ok(payload) => {
                let message = InboundMessage {
                    room: payload
                        .room
                        .unwrap_or_else(|| shared.config.room.as_str().to_string()),
                    user: payload.user,
                    text: payload.text,
                    ts: payload.ts,
                };
                shared.emit(SessionEvent::Message(message));
            }
            Err(e) => tracing::warn!(%e, "Dropping malformed {} event", name),
        },
        event::RATE_LIMITED => {
            let payload: RateLimitedPayload = serde_json::from_value(payload).unwrap_or_default();
            tracing::warn!("Rate limited by server: {}", payload.msg);
            shared.emit(SessionEvent::RateLimited {
                message: payload.msg,
            });
        }
        other => tracing::debug!("Ignoring unknown event '{}'", other),
    }
}
