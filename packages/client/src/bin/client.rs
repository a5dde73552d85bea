//! Terminal chat client.
//!
//! Logs in with a username and password, joins the chat room and prints
//! incoming messages as they arrive.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsudoi-client -- --api-url http://localhost:8000
//! ```
//!
//! Environment variables (a `.env` file is read as well):
//!   API_URL - API base URL (default: http://localhost:8000)
//!   CHAT_ROOM - room to send messages to (default: global)
//!   RUST_LOG - log filter, overrides --log-level

use std::time::Duration;

use clap::{Parser, ValueEnum};
use tsudoi_client::{
    ClientConfig, ClientError,
    domain::{Credential, RoomName},
    session::SendPolicy,
    ui::CliError,
};
use tsudoi_shared::logger::setup_logger;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SendPolicyArg {
    /// Keep messages while disconnected and send them after reconnecting
    Queue,
    /// Refuse messages while disconnected
    Reject,
}

#[derive(Parser, Debug)]
#[command(name = "tsudoi-client")]
#[command(about = "Terminal client for the Tsudoi realtime chat")]
#[command(version)]
struct Args {
    /// API base URL
    #[arg(long, env = "API_URL")]
    api_url: Option<String>,

    /// Room to send messages to
    #[arg(long, env = "CHAT_ROOM")]
    room: Option<String>,

    /// What to do with messages sent while not connected
    #[arg(long, value_enum, default_value = "queue")]
    send_policy: SendPolicyArg,

    /// Maximum number of queued messages
    #[arg(long, default_value = "64")]
    queue_capacity: usize,

    /// Give up after this many failed reconnect attempts (default: never)
    #[arg(long)]
    max_reconnect_attempts: Option<u32>,

    /// Connect + handshake timeout in seconds
    #[arg(long, default_value = "20")]
    handshake_timeout_secs: u64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log in as this user on startup (requires --password)
    #[arg(long, requires = "password")]
    username: Option<String>,

    /// Password for --username
    #[arg(long, requires = "username")]
    password: Option<String>,
}

async fn run(args: Args) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = args.api_url.as_deref() {
        let room = config.session.room;
        config = ClientConfig::from_api_url(api_url)?;
        config.session.room = room;
    }

    if let Some(room) = args.room {
        config.session.room = RoomName::new(room).map_err(ClientError::from)?;
    }
    config.session.send_policy = match args.send_policy {
        SendPolicyArg::Queue => SendPolicy::Queue {
            capacity: args.queue_capacity,
        },
        SendPolicyArg::Reject => SendPolicy::Reject,
    };
    config.session.reconnect.max_attempts = args.max_reconnect_attempts;
    config.session.handshake_timeout = Duration::from_secs(args.handshake_timeout_secs);

    let auto_login = match (args.username, args.password) {
        (Some(username), Some(password)) => {
            Some(Credential::parse(username, password).map_err(ClientError::from)?)
        }
        _ => None,
    };

    tsudoi_client::run_client(config, auto_login).await
}

#[tokio::main]
async fn main() {
    // .env has to be loaded before clap reads the environment
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // Run the client
    if let Err(e) = run(args).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
