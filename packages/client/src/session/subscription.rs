//! Subscription table for session events.
//!
//! Each [`EventKind`] has a single handler slot. Registering a handler for a
//! kind replaces the previous one. Handlers are invoked without any lock held,
//! so they may subscribe, unsubscribe or close the channel themselves.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak},
    thread::{self, ThreadId},
};

use crate::domain::{ConnectionState, InboundMessage};

/// Event delivered by a session channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A chat message arrived
    Message(InboundMessage),
    /// The server dropped one of our messages because we sent too fast
    RateLimited { message: String },
    /// The connection state changed
    StateChanged(ConnectionState),
    /// The driver gave up. A new login is needed to continue.
    Stopped(StopReason),
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::Message(_) => EventKind::Message,
            SessionEvent::RateLimited { .. } => EventKind::RateLimited,
            SessionEvent::StateChanged(_) => EventKind::StateChanged,
            SessionEvent::Stopped(_) => EventKind::Stopped,
        }
    }
}

/// Why a session stopped without being closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The server refused the token
    Rejected(String),
    /// The server disconnected the socket on purpose
    ServerDisconnect,
    /// Reconnecting failed `attempts` times in a row
    ReconnectExhausted { attempts: u32 },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Rejected(reason) => write!(f, "rejected by server: {reason}"),
            StopReason::ServerDisconnect => write!(f, "disconnected by server"),
            StopReason::ReconnectExhausted { attempts } => {
                write!(f, "gave up after {attempts} reconnect attempts")
            }
        }
    }
}

/// Subscription slot key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    RateLimited,
    StateChanged,
    Stopped,
}

type Handler = Box<dyn FnMut(&SessionEvent) + Send>;

struct Slot {
    id: u64,
    /// `None` while the handler is running
    handler: Option<Handler>,
}

#[derive(Default)]
struct Slots {
    released: bool,
    next_id: u64,
    slots: HashMap<EventKind, Slot>,
    /// Thread currently running a handler
    dispatching: Option<ThreadId>,
}

/// Handler registry shared by a channel, its driver and its subscriptions.
#[derive(Default)]
pub(crate) struct SubscriptionTable {
    inner: Mutex<Slots>,
    idle: Condvar,
}

impl SubscriptionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `handler` for `kind`, replacing any previous one.
    ///
    /// Returns `None` once the table has been released.
    pub(crate) fn register(&self, kind: EventKind, handler: Handler) -> Option<u64> {
        let (id, replaced) = {
            let mut inner = self.lock();
            if inner.released {
                return None;
            }
            inner.next_id += 1;
            let id = inner.next_id;
            let slot = Slot {
                id,
                handler: Some(handler),
            };
            (id, inner.slots.insert(kind, slot))
        };
        drop(replaced);
        Some(id)
    }

    /// Remove the handler registered as `id`. A no-op if it was replaced or
    /// already removed.
    pub(crate) fn remove(&self, kind: EventKind, id: u64) -> bool {
        let removed = {
            let mut inner = self.lock();
            match inner.slots.get(&kind) {
                Some(slot) if slot.id == id => inner.slots.remove(&kind),
                _ => None,
            }
        };
        removed.is_some()
    }

    pub(crate) fn is_registered(&self, kind: EventKind, id: u64) -> bool {
        self.lock().slots.get(&kind).is_some_and(|slot| slot.id == id)
    }

    /// Invoke the handler for the event's kind, if any.
    ///
    /// Returns whether a handler ran.
    pub(crate) fn dispatch(&self, event: &SessionEvent) -> bool {
        let kind = event.kind();
        let (id, mut handler) = {
            let mut inner = self.lock();
            if inner.released {
                return false;
            }
            let Some(slot) = inner.slots.get_mut(&kind) else {
                return false;
            };
            let Some(handler) = slot.handler.take() else {
                return false;
            };
            let id = slot.id;
            inner.dispatching = Some(thread::current().id());
            (id, handler)
        };

        {
            let _guard = DispatchGuard { table: self };
            handler(event);
        }

        let mut inner = self.lock();
        let restore = !inner.released
            && inner
                .slots
                .get(&kind)
                .is_some_and(|slot| slot.id == id && slot.handler.is_none());
        if restore && let Some(slot) = inner.slots.get_mut(&kind) {
            slot.handler = Some(handler);
            return true;
        }
        drop(inner);
        // replaced or unsubscribed while running
        drop(handler);
        true
    }

    /// Drop every handler and refuse new ones.
    ///
    /// When another thread is running a handler, waits for it to return so
    /// that no handler runs after this call.
    pub(crate) fn release_all(&self) {
        let slots = {
            let mut inner = self.lock();
            inner.released = true;
            let current = thread::current().id();
            while inner.dispatching.is_some_and(|tid| tid != current) {
                inner = self.idle.wait(inner).unwrap_or_else(PoisonError::into_inner);
            }
            std::mem::take(&mut inner.slots)
        };
        drop(slots);
    }

    pub(crate) fn is_released(&self) -> bool {
        self.lock().released
    }
}

/// Clears the dispatching marker even if the handler panics.
struct DispatchGuard<'a> {
    table: &'a SubscriptionTable,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.table.lock().dispatching = None;
        self.table.idle.notify_all();
    }
}

/// Handle to one registered handler.
///
/// Dropping the handle does not unsubscribe. Call
/// [`unsubscribe`](Self::unsubscribe) to remove the handler.
pub struct Subscription {
    table: Weak<SubscriptionTable>,
    kind: EventKind,
    id: Option<u64>,
}

impl Subscription {
    pub(crate) fn new(table: &Arc<SubscriptionTable>, kind: EventKind, id: Option<u64>) -> Self {
        Self {
            table: Arc::downgrade(table),
            kind,
            id,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Whether this handler is still installed.
    pub fn is_active(&self) -> bool {
        match (self.table.upgrade(), self.id) {
            (Some(table), Some(id)) => table.is_registered(self.kind, id),
            _ => false,
        }
    }

    /// Remove the handler. Idempotent, and never touches a handler that
    /// replaced this one.
    pub fn unsubscribe(&self) {
        if let (Some(table), Some(id)) = (self.table.upgrade(), self.id)
            && table.remove(self.kind, id)
        {
            tracing::debug!("Unsubscribed {:?} handler #{}", self.kind, id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}
