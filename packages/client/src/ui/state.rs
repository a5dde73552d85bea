//! Terminal client state: current session, conversation view and the use
//! cases that act on them.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{
    command::{Command, HELP},
    view::{ConversationView, render_message},
};
use crate::{
    config::ClientConfig,
    domain::{ConnectionState, Credential, CredentialExchange},
    error::ClientError,
    infrastructure::transport::Connector,
    session::{EventKind, SessionChannel, SessionEvent},
    usecase::{LoginUseCase, LogoutUseCase, RegisterUseCase, SendMessageUseCase},
};

/// Session event tagged with the login generation it belongs to.
pub type TaggedEvent = (u64, SessionEvent);

/// Result of handling one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Keep running, optionally printing a status line
    Continue(Option<String>),
    Quit,
}

/// Client application state.
pub struct ChatApp {
    login: LoginUseCase,
    register: RegisterUseCase,
    logout: LogoutUseCase,
    send: SendMessageUseCase,
    session: Option<SessionChannel>,
    view: ConversationView,
    /// Incremented on every login so that events of replaced sessions are
    /// ignored
    generation: u64,
    events: mpsc::UnboundedSender<TaggedEvent>,
}

impl ChatApp {
    /// Create the application and the receiver for its session events.
    pub fn new(
        config: &ClientConfig,
        exchange: Arc<dyn CredentialExchange>,
        connector: Arc<dyn Connector>,
    ) -> (Self, mpsc::UnboundedReceiver<TaggedEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let app = Self {
            login: LoginUseCase::new(exchange.clone(), connector, config.session.clone()),
            register: RegisterUseCase::new(exchange),
            logout: LogoutUseCase::new(),
            send: SendMessageUseCase::new(),
            session: None,
            view: ConversationView::new(),
            generation: 0,
            events,
        };
        (app, events_rx)
    }

    pub fn view(&self) -> &ConversationView {
        &self.view
    }

    pub fn session(&self) -> Option<&SessionChannel> {
        self.session.as_ref()
    }

    /// Current connection state (`Disconnected` when logged out).
    pub fn state(&self) -> ConnectionState {
        self.session
            .as_ref()
            .map_or(ConnectionState::Disconnected, SessionChannel::state)
    }

    /// Handle one user intent.
    ///
    /// # Errors
    ///
    /// Errors of the underlying use case. The application state stays
    /// usable after an error.
    pub async fn handle(&mut self, command: Command) -> Result<Outcome, ClientError> {
        match command {
            Command::Empty => Ok(Outcome::Continue(None)),
            Command::Help => Ok(Outcome::Continue(Some(HELP.to_string()))),
            Command::Quit => {
                self.shutdown();
                Ok(Outcome::Quit)
            }
            Command::Register { username, password } => {
                let credential = Credential::parse(username, password)?;
                let name = credential.username.to_string();
                self.register.execute(credential).await?;
                Ok(Outcome::Continue(Some(format!(
                    "* registered '{name}', now /login {name} <password>"
                ))))
            }
            Command::Login { username, password } => {
                let credential = Credential::parse(username, password)?;
                let name = credential.username.to_string();
                let generation = self.generation + 1;
                let events = self.events.clone();
                self.login
                    .execute(credential, &mut self.session, |channel| {
                        wire(channel, generation, &events)
                    })
                    .await?;
                self.generation = generation;
                Ok(Outcome::Continue(Some(format!("* logged in as '{name}'"))))
            }
            Command::Logout => {
                let message = if self.logout.execute(&mut self.session) {
                    "* logged out"
                } else {
                    "* not logged in"
                };
                Ok(Outcome::Continue(Some(message.to_string())))
            }
            Command::Say(text) => {
                self.send.execute(self.session.as_ref(), text)?;
                Ok(Outcome::Continue(None))
            }
        }
    }

    /// Apply a session event. Returns the line to print, if any.
    pub fn on_event(&mut self, (generation, event): TaggedEvent) -> Option<String> {
        if generation != self.generation {
            return None;
        }
        match event {
            SessionEvent::Message(message) => {
                let line = render_message(&message);
                self.view.push(message);
                Some(line)
            }
            SessionEvent::RateLimited { message } => Some(format!("! {message}")),
            SessionEvent::StateChanged(state) => Some(format!("* {state}")),
            SessionEvent::Stopped(reason) => {
                // the token is spent, a new login is needed
                self.logout.execute(&mut self.session);
                Some(format!("* session ended: {reason} (use /login)"))
            }
        }
    }

    /// Close the current session, if any.
    pub fn shutdown(&mut self) {
        self.logout.execute(&mut self.session);
    }
}

/// Forward every event kind of `channel` into the application queue.
fn wire(
    channel: &SessionChannel,
    generation: u64,
    events: &mpsc::UnboundedSender<TaggedEvent>,
) {
    for kind in [
        EventKind::Message,
        EventKind::RateLimited,
        EventKind::StateChanged,
        EventKind::Stopped,
    ] {
        let events = events.clone();
        channel.on(kind, move |event| {
            let _ = events.send((generation, event.clone()));
        });
    }
}
