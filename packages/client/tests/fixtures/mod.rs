//! In-process fake chat server for integration tests.
//!
//! Serves `/register`, `/token` and the WebSocket subset of Socket.IO the
//! client speaks. Tokens are `token-<username>`. Every `send_message` event
//! is broadcast to all connected sockets as `new_message`.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::broadcast, task::JoinHandle};
use tsudoi_client::{
    ClientConfig,
    domain::ConnectionState,
    session::{ReconnectPolicy, SessionEvent},
};

const OPEN: &str = r#"0{"sid":"fake-sid","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

/// How `/token` answers valid credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMode {
    Normal,
    MissingField,
    NotJson,
}

#[derive(Debug, Deserialize)]
struct CredentialForm {
    username: String,
    password: String,
}

struct ServerState {
    users: Mutex<HashMap<String, String>>,
    token_mode: Mutex<TokenMode>,
    feed: broadcast::Sender<String>,
    kick: broadcast::Sender<()>,
    token_requests: AtomicUsize,
    socket_connections: AtomicUsize,
}

/// Fake server bound to an ephemeral local port.
pub struct TestServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let (feed, _) = broadcast::channel(64);
        let (kick, _) = broadcast::channel(4);
        let state = Arc::new(ServerState {
            users: Mutex::new(HashMap::new()),
            token_mode: Mutex::new(TokenMode::Normal),
            feed,
            kick,
            token_requests: AtomicUsize::new(0),
            socket_connections: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/register", post(register))
            .route("/token", post(token))
            .route("/ws/socket.io/", get(websocket))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read local address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            _handle: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this server, with fast reconnects.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_api_url(&self.base_url()).expect("valid test URL");
        config.session.reconnect = ReconnectPolicy {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            max_attempts: None,
        };
        config.session.handshake_timeout = Duration::from_secs(5);
        config
    }

    pub fn add_user(&self, username: &str, password: &str) {
        self.state
            .users
            .lock()
            .unwrap()
            .insert(username.to_string(), password.to_string());
    }

    pub fn set_token_mode(&self, mode: TokenMode) {
        *self.state.token_mode.lock().unwrap() = mode;
    }

    /// Drop every open socket without a close handshake.
    pub fn kick_all(&self) {
        let _ = self.state.kick.send(());
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    pub fn socket_connections(&self) -> usize {
        self.state.socket_connections.load(Ordering::SeqCst)
    }
}

async fn register(
    State(state): State<Arc<ServerState>>,
    Form(form): Form<CredentialForm>,
) -> Response {
    let mut users = state.users.lock().unwrap();
    if users.contains_key(&form.username) {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "User exists"}))).into_response();
    }
    users.insert(form.username, form.password);
    Json(json!({"msg": "registered"})).into_response()
}

async fn token(
    State(state): State<Arc<ServerState>>,
    Form(form): Form<CredentialForm>,
) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    let valid = state
        .users
        .lock()
        .unwrap()
        .get(&form.username)
        .is_some_and(|password| *password == form.password);
    if !valid {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect credentials"})),
        )
            .into_response();
    }

    let mode = *state.token_mode.lock().unwrap();
    match mode {
        TokenMode::Normal => Json(json!({
            "access_token": format!("token-{}", form.username),
            "token_type": "bearer",
        }))
        .into_response(),
        TokenMode::MissingField => Json(json!({"token_type": "bearer"})).into_response(),
        TokenMode::NotJson => "oops".into_response(),
    }
}

async fn websocket(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn text(frame: impl Into<String>) -> Message {
    Message::Text(frame.into().into())
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    state.socket_connections.fetch_add(1, Ordering::SeqCst);
    let (mut sender, mut receiver) = socket.split();

    if sender.send(text(OPEN)).await.is_err() {
        return;
    }

    // Socket.IO CONNECT with {"token": ...}
    let user = loop {
        let Some(Ok(message)) = receiver.next().await else {
            return;
        };
        let Message::Text(frame) = message else {
            continue;
        };
        let Some(auth) = frame.as_str().strip_prefix("40") else {
            continue;
        };
        let token = serde_json::from_str::<Value>(auth)
            .ok()
            .and_then(|auth| auth["token"].as_str().map(str::to_string))
            .unwrap_or_default();
        match token.strip_prefix("token-") {
            Some(user) if !user.is_empty() => break user.to_string(),
            _ => {
                let _ = sender
                    .send(text(r#"44{"message":"Connection rejected by server"}"#))
                    .await;
                return;
            }
        }
    };

    let mut feed = state.feed.subscribe();
    let mut kick = state.kick.subscribe();
    if sender.send(text(r#"40{"sid":"fake-socket"}"#)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let frame = match incoming {
                    Some(Ok(Message::Text(frame))) => frame,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };
                let frame = frame.as_str();
                if frame == "41" {
                    break;
                }
                if let Some(event) = frame.strip_prefix("42")
                    && let Ok(Value::Array(args)) = serde_json::from_str::<Value>(event)
                    && args.first().and_then(Value::as_str) == Some("send_message")
                {
                    let body = args.get(1).cloned().unwrap_or(Value::Null);
                    let text_value = body["text"].clone();
                    let message = json!([
                        "new_message",
                        {
                            "user": user,
                            "text": text_value,
                            "ts": chrono::Utc::now().timestamp(),
                        }
                    ]);
                    let _ = state.feed.send(format!("42{message}"));
                }
            }
            frame = feed.recv() => match frame {
                Ok(frame) => {
                    if sender.send(text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = kick.recv() => break,
        }
    }
}

/// Wait until the watched state satisfies `predicate`.
pub async fn wait_for_state<F>(
    rx: &mut tokio::sync::watch::Receiver<ConnectionState>,
    mut predicate: F,
) where
    F: FnMut(&ConnectionState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|state| predicate(state)))
        .await
        .expect("state was not reached in time")
        .expect("state sender dropped");
}

/// Receive the next event or fail after a few seconds.
pub async fn next_event(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no event in time")
        .expect("event sender dropped")
}
