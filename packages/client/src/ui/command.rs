//! Parsing of user input lines.

use thiserror::Error;

pub const HELP: &str = "\
/register <username> <password>  create an account
/login <username> <password>     log in and join the chat
/logout                          leave the chat
/help                            show this help
/quit                            exit
anything else                    send a message";

/// One user intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { username: String, password: String },
    Login { username: String, password: String },
    Logout,
    Help,
    Quit,
    /// Plain text to send as a chat message
    Say(String),
    /// Blank line
    Empty,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '{0}' (try /help)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Command::Empty);
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            // keep inner whitespace of chat messages as typed
            return Ok(Command::Say(line.trim_end_matches(['\r', '\n']).to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match (name, args.as_slice()) {
            ("login", [username, password]) => Ok(Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            }),
            ("login", _) => Err(CommandError::Usage("/login <username> <password>")),
            ("register", [username, password]) => Ok(Command::Register {
                username: username.to_string(),
                password: password.to_string(),
            }),
            ("register", _) => Err(CommandError::Usage("/register <username> <password>")),
            ("logout", _) => Ok(Command::Logout),
            ("help", _) => Ok(Command::Help),
            ("quit" | "exit", _) => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(format!("/{name}"))),
        }
    }
}
