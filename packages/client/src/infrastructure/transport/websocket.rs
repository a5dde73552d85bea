//! WebSocket transport based on `tokio-tungstenite`.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use super::{Connector, Transport};
use crate::error::ClientError;

/// Opens [`WsTransport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, ClientError> {
        tracing::debug!(%url, "Opening WebSocket");
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| ClientError::Transport(format!("failed to connect to {url}: {e}")))?;
        tracing::debug!(status = response.status().as_u16(), "WebSocket upgraded");
        Ok(Box::new(WsTransport { stream }))
    }
}

/// One WebSocket connection.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: String) -> Result<(), ClientError> {
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ClientError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    tracing::debug!("WebSocket closed by peer: {:?}", frame);
                    return None;
                }
                Ok(Message::Binary(bytes)) => {
                    tracing::warn!("Ignoring binary frame ({} bytes)", bytes.len());
                }
                // tungstenite answers pings itself
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => return Some(Err(ClientError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("WebSocket close failed: {}", e);
        }
    }
}
