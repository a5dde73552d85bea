//! In-memory transport for driving session channels in unit tests.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    sync::{mpsc, watch},
    time::timeout,
};

use crate::{
    domain::ConnectionState,
    error::ClientError,
    infrastructure::transport::{Connector, Transport},
};

/// Engine.IO open packet with default heartbeat settings.
pub(crate) const OPEN: &str = r#"0{"sid":"test-sid","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

const WAIT: Duration = Duration::from_secs(2);

struct ConnectorState {
    refuse: usize,
    attempts: usize,
    accepted: mpsc::UnboundedSender<FakeConnection>,
}

/// Connector whose connections show up on the paired [`FakeServer`].
pub(crate) struct FakeConnector {
    state: Mutex<ConnectorState>,
}

impl FakeConnector {
    pub(crate) fn new() -> (Arc<Self>, FakeServer) {
        let (accepted, incoming) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            state: Mutex::new(ConnectorState {
                refuse: 0,
                attempts: 0,
                accepted,
            }),
        });
        (connector, FakeServer { incoming })
    }

    /// Fail the next `count` connect attempts.
    pub(crate) fn refuse_next(&self, count: usize) {
        self.state.lock().unwrap().refuse = count;
    }

    pub(crate) fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Transport>, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.attempts += 1;
        if state.refuse > 0 {
            state.refuse -= 1;
            return Err(ClientError::Transport("connection refused".to_string()));
        }

        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        let _ = state.accepted.send(FakeConnection {
            to_client,
            from_client,
        });
        Ok(Box::new(FakeTransport { incoming, outgoing }))
    }
}

struct FakeTransport {
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&mut self, frame: String) -> Result<(), ClientError> {
        self.outgoing
            .send(frame)
            .map_err(|_| ClientError::Transport("peer closed".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ClientError>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.incoming.close();
    }
}

/// Accepts connections made through a [`FakeConnector`].
pub(crate) struct FakeServer {
    incoming: mpsc::UnboundedReceiver<FakeConnection>,
}

impl FakeServer {
    pub(crate) async fn accept(&mut self) -> FakeConnection {
        timeout(WAIT, self.incoming.recv())
            .await
            .expect("no connection attempt")
            .expect("connector dropped")
    }

    pub(crate) async fn try_accept(&mut self, wait: Duration) -> Option<FakeConnection> {
        timeout(wait, self.incoming.recv()).await.ok().flatten()
    }
}

/// Server side of one fake connection. Dropping it disconnects the client.
pub(crate) struct FakeConnection {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl FakeConnection {
    pub(crate) fn emit(&self, frame: &str) {
        let _ = self.to_client.send(frame.to_string());
    }

    pub(crate) async fn next_frame(&mut self) -> String {
        timeout(WAIT, self.from_client.recv())
            .await
            .expect("no frame from client")
            .expect("client closed the connection")
    }

    pub(crate) async fn try_next_frame(&mut self, wait: Duration) -> Option<String> {
        timeout(wait, self.from_client.recv()).await.ok().flatten()
    }

    /// Play the server side of a successful handshake and return the
    /// client's CONNECT frame.
    pub(crate) async fn handshake(&mut self) -> String {
        self.emit(OPEN);
        let connect = self.next_frame().await;
        assert!(connect.starts_with("40"), "unexpected frame {connect}");
        self.emit(r#"40{"sid":"socket-sid"}"#);
        connect
    }

    /// Wait until the client dropped its end and return what it sent last.
    pub(crate) async fn drain(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(Some(frame)) = timeout(WAIT, self.from_client.recv()).await {
            frames.push(frame);
        }
        frames
    }
}

pub(crate) async fn wait_for_state<F>(rx: &mut watch::Receiver<ConnectionState>, mut predicate: F)
where
    F: FnMut(&ConnectionState) -> bool,
{
    timeout(WAIT, rx.wait_for(|state| predicate(state)))
        .await
        .expect("state was not reached in time")
        .expect("state sender dropped");
}
