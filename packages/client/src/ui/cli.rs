//! Terminal front end.
//!
//! A `rustyline` editor runs on its own thread and forwards lines to the
//! async loop, which also receives session events and prints them.

use std::{sync::Arc, thread};

use rustyline::{DefaultEditor, error::ReadlineError};
use thiserror::Error;
use tokio::sync::mpsc;

use super::{
    command::Command,
    state::{ChatApp, Outcome},
};
use crate::{
    config::{ClientConfig, ConfigError},
    domain::Credential,
    error::ClientError,
    infrastructure::{HttpCredentialExchange, WsConnector},
};

const PROMPT: &str = "> ";

/// Errors that end the terminal client.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Line editor error: {0}")]
    Editor(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

enum Input {
    Line(String),
    /// Ctrl-C, Ctrl-D or a closed stdin
    Exit,
    Failed(String),
}

/// Run the interactive client until the user quits.
///
/// # Arguments
///
/// * `config` - API and session settings
/// * `auto_login` - Credentials to log in with before the first prompt
pub async fn run_client(
    config: ClientConfig,
    auto_login: Option<Credential>,
) -> Result<(), CliError> {
    tracing::info!(api_url = %config.api_url, room = %config.session.room, "Starting client");

    let exchange = Arc::new(HttpCredentialExchange::new(&config.api_url));
    let (mut app, mut events) = ChatApp::new(&config, exchange, Arc::new(WsConnector));

    println!("Tsudoi client for {}. Type /help for commands.", config.api_url);

    if let Some(credential) = auto_login {
        let command = Command::Login {
            username: credential.username.into_string(),
            password: credential.password.as_str().to_string(),
        };
        report(app.handle(command).await);
    }

    let mut input = spawn_input_thread();

    loop {
        tokio::select! {
            line = input.recv() => match line {
                Some(Input::Line(line)) => match Command::parse(&line) {
                    Ok(command) => {
                        if report(app.handle(command).await) {
                            break;
                        }
                    }
                    Err(e) => println!("! {e}"),
                },
                Some(Input::Exit) | None => break,
                Some(Input::Failed(e)) => {
                    app.shutdown();
                    return Err(CliError::Editor(e));
                }
            },
            Some(event) = events.recv() => {
                if let Some(line) = app.on_event(event) {
                    println!("{line}");
                }
            }
        }
    }

    app.shutdown();
    tracing::info!("Client stopped");
    Ok(())
}

/// Print the outcome of a command. Returns `true` when the client should
/// exit.
fn report(result: Result<Outcome, ClientError>) -> bool {
    match result {
        Ok(Outcome::Quit) => true,
        Ok(Outcome::Continue(Some(line))) => {
            println!("{line}");
            false
        }
        Ok(Outcome::Continue(None)) => false,
        Err(e) => {
            println!("! {e}");
            false
        }
    }
}

/// Read lines on a dedicated thread.
///
/// A plain thread rather than `spawn_blocking`: a pending `readline` must not
/// hold up runtime shutdown.
fn spawn_input_thread() -> mpsc::Receiver<Input> {
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                let _ = tx.blocking_send(Input::Failed(e.to_string()));
                return;
            }
        };
        loop {
            let input = match editor.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    Input::Line(line)
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => Input::Exit,
                Err(e) => Input::Failed(e.to_string()),
            };
            let stop = !matches!(input, Input::Line(_));
            if tx.blocking_send(input).is_err() || stop {
                break;
            }
        }
    });
    rx
}
