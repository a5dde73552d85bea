//! Session channel handle.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::{Notify, watch};

use super::{
    config::{SendPolicy, SessionConfig},
    driver,
    outbox::Outbox,
    subscription::{EventKind, SessionEvent, StopReason, Subscription, SubscriptionTable},
};
use crate::{
    domain::{ConnectionState, InboundMessage, OutgoingMessage, RoomName, Token},
    error::ClientError,
    infrastructure::{
        dto::socketio::{SendMessagePayload, event},
        protocol::{EnginePacket, SocketPacket},
        transport::Connector,
    },
};

/// State shared between a [`SessionChannel`] and its driver task.
pub(crate) struct Shared {
    pub(crate) config: SessionConfig,
    state: watch::Sender<ConnectionState>,
    subscriptions: Arc<SubscriptionTable>,
    outbox: Mutex<Outbox>,
    /// Woken whenever a frame is pushed to the outbox
    pub(crate) outbox_ready: Notify,
    /// The driver gave up for good
    stopped: AtomicBool,
}

impl Shared {
    fn new(config: SessionConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            state,
            subscriptions: Arc::new(SubscriptionTable::new()),
            outbox: Mutex::new(Outbox::new()),
            outbox_ready: Notify::new(),
            stopped: AtomicBool::new(false),
        }
    }

    fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state().is_closed()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Move to `next` unless the channel is closed. Returns whether the
    /// state changed.
    pub(crate) fn transition(&self, next: ConnectionState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if current.is_closed() || *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            tracing::debug!(state = %next, "Session state changed");
            self.emit(SessionEvent::StateChanged(next));
        }
        changed
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.subscriptions.dispatch(&event);
    }

    /// Oldest pending frame, left in place.
    pub(crate) fn peek_outbound(&self) -> Option<String> {
        self.outbox().front()
    }

    /// Remove the frame returned by the last successful peek.
    pub(crate) fn ack_outbound(&self) {
        self.outbox().pop_front();
    }

    /// The driver gave up: refuse further sends and tell subscribers why.
    pub(crate) fn stop(&self, reason: StopReason) {
        let dropped = {
            let mut outbox = self.outbox();
            self.stopped.store(true, Ordering::SeqCst);
            outbox.clear()
        };
        if dropped > 0 {
            tracing::warn!("Dropped {} unsent message(s)", dropped);
        }
        tracing::warn!(%reason, "Session stopped");
        self.transition(ConnectionState::Disconnected);
        self.emit(SessionEvent::Stopped(reason));
    }

    fn close(&self) -> bool {
        self.subscriptions.release_all();
        let changed = self.state.send_if_modified(|current| {
            if current.is_closed() {
                return false;
            }
            *current = ConnectionState::Closed;
            true
        });
        let dropped = self.outbox().clear();
        if changed {
            tracing::info!("Session closed ({} unsent message(s) dropped)", dropped);
        }
        changed
    }
}

/// One authenticated, long-lived connection to the chat server.
///
/// Created with a [`Token`], which is consumed when the channel starts. The
/// background driver runs on the ambient tokio runtime until the channel is
/// closed (explicitly or by dropping it) or the server ends the session.
pub struct SessionChannel {
    shared: Arc<Shared>,
    token: Mutex<Option<Token>>,
    connector: Arc<dyn Connector>,
}

impl SessionChannel {
    /// Create a channel without connecting it.
    ///
    /// The state is `Disconnected` until [`start`](Self::start) is called.
    /// Sends made in the meantime follow the configured [`SendPolicy`].
    pub fn new(token: Token, config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            shared: Arc::new(Shared::new(config)),
            token: Mutex::new(Some(token)),
            connector,
        }
    }

    /// Create a channel and start connecting. Does not wait for the
    /// connection: observe [`state`](Self::state) or subscribe to
    /// [`EventKind::StateChanged`].
    ///
    /// # Errors
    ///
    /// * `ClientError::Transport` - no tokio runtime is available
    pub fn connect(
        token: Token,
        config: SessionConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ClientError> {
        let channel = Self::new(token, config, connector);
        channel.start()?;
        Ok(channel)
    }

    /// Begin connecting. Calling it again after the first start is a no-op.
    ///
    /// # Errors
    ///
    /// * `ClientError::NotConnected` - the channel is closed
    /// * `ClientError::Transport` - no tokio runtime is available
    pub fn start(&self) -> Result<(), ClientError> {
        if self.shared.is_closed() {
            return Err(ClientError::NotConnected {
                state: ConnectionState::Closed,
            });
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ClientError::Transport(format!("no async runtime: {e}")))?;

        let Some(token) = self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return Ok(());
        };

        self.shared.transition(ConnectionState::Connecting);
        runtime.spawn(driver::run(self.shared.clone(), token, self.connector.clone()));
        Ok(())
    }

    /// Enqueue a message for delivery. Never waits for the network.
    ///
    /// # Errors
    ///
    /// * `ClientError::NotConnected` - the channel is closed or stopped, or it
    ///   is not connected and the policy is [`SendPolicy::Reject`]
    /// * `ClientError::QueueFull` - not connected and the queue is at capacity
    pub fn send(&self, message: OutgoingMessage) -> Result<(), ClientError> {
        let frame = encode_send_message(&message)?;
        {
            let mut outbox = self.shared.outbox();
            let state = self.shared.state();
            if state.is_closed() || self.shared.stopped.load(Ordering::SeqCst) {
                return Err(ClientError::NotConnected { state });
            }
            if !state.is_connected() {
                match self.shared.config.send_policy {
                    SendPolicy::Reject => return Err(ClientError::NotConnected { state }),
                    SendPolicy::Queue { capacity } if outbox.len() >= capacity => {
                        return Err(ClientError::QueueFull { capacity });
                    }
                    SendPolicy::Queue { .. } => {
                        tracing::debug!(%state, "Queueing message until connected");
                    }
                }
            }
            outbox.push(frame);
        }
        self.shared.outbox_ready.notify_one();
        Ok(())
    }

    /// Install the handler for inbound chat messages, replacing the previous
    /// one.
    pub fn subscribe<F>(&self, mut handler: F) -> Subscription
    where
        F: FnMut(&InboundMessage) + Send + 'static,
    {
        self.on(EventKind::Message, move |event| {
            if let SessionEvent::Message(message) = event {
                handler(message);
            }
        })
    }

    /// Install the handler for `kind`, replacing the previous one.
    ///
    /// On a closed channel the handler is dropped and the returned
    /// subscription is inactive.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: FnMut(&SessionEvent) + Send + 'static,
    {
        let table = &self.shared.subscriptions;
        let id = table.register(kind, Box::new(handler));
        if id.is_none() {
            tracing::debug!("Ignoring {:?} subscription on a closed session", kind);
        }
        Subscription::new(table, kind, id)
    }

    /// Close the channel. Idempotent.
    ///
    /// Subscriptions are released first: no handler starts after this
    /// returns. Pending messages are dropped and the driver disconnects.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.watch()
    }

    /// Number of messages waiting to be written.
    pub fn pending(&self) -> usize {
        self.shared.outbox().len()
    }

    /// Room outgoing messages are addressed to.
    pub fn room(&self) -> &RoomName {
        &self.shared.config.room
    }
}

impl Drop for SessionChannel {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl std::fmt::Debug for SessionChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionChannel")
            .field("state", &self.state())
            .field("room", self.room())
            .field("pending", &self.pending())
            .finish()
    }
}

fn encode_send_message(message: &OutgoingMessage) -> Result<String, ClientError> {
    let payload = SendMessagePayload {
        room: message.room.as_str().to_string(),
        text: message.text.as_str().to_string(),
    };
    let payload = serde_json::to_value(payload)
        .map_err(|e| ClientError::Protocol(format!("failed to encode message: {e}")))?;
    let packet = SocketPacket::event(event::SEND_MESSAGE, payload);
    Ok(EnginePacket::Message(packet).encode())
}
