//! UI layer: a line-oriented terminal client on top of the core.

pub mod cli;
pub mod command;
pub mod state;
pub mod view;

pub use cli::{CliError, run_client};
pub use command::{Command, CommandError};
pub use state::{ChatApp, Outcome};
pub use view::ConversationView;
