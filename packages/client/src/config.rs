//! Client configuration.
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present). Command line flags in the binary take precedence.

use std::env;

use reqwest::Url;
use thiserror::Error;

use crate::{domain::RoomName, session::SessionConfig};

/// Default API base URL, used when `API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Path the server mounts its Socket.IO endpoint on.
pub const SOCKET_IO_PATH: &str = "/ws/socket.io/";

/// Query string selecting Engine.IO v4 over a plain WebSocket.
const SOCKET_IO_QUERY: &str = "EIO=4&transport=websocket";

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{0}' (expected http, https, ws or wss)")]
    UnsupportedScheme(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Top level client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the HTTP API (`/token`, `/register`)
    pub api_url: Url,
    /// Session channel settings
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Build a configuration for `api_url` with default session settings.
    ///
    /// A `ws`/`wss` base is accepted and stored as `http`/`https`, since the
    /// credential endpoints are plain HTTP.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the URL does not parse or its scheme is not
    /// one of `http`, `https`, `ws`, `wss`.
    pub fn from_api_url(api_url: &str) -> Result<Self, ConfigError> {
        let mut api_url = Url::parse(api_url).map_err(|e| ConfigError::InvalidUrl {
            url: api_url.to_string(),
            reason: e.to_string(),
        })?;
        let socket_url = socket_url(&api_url)?;
        let http_scheme = match api_url.scheme() {
            "ws" => Some("http"),
            "wss" => Some("https"),
            _ => None,
        };
        if let Some(scheme) = http_scheme {
            api_url
                .set_scheme(scheme)
                .map_err(|_| ConfigError::UnsupportedScheme(api_url.scheme().to_string()))?;
        }
        Ok(Self {
            api_url,
            session: SessionConfig::new(socket_url),
        })
    }

    /// Load configuration from the process environment.
    ///
    /// * `API_URL` - API base URL (default `http://localhost:8000`)
    /// * `CHAT_ROOM` - room to send messages to (default `global`)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self::from_api_url(&api_url)?;

        if let Some(room) = lookup("CHAT_ROOM") {
            config.session.room = RoomName::new(room)
                .map_err(|e| ConfigError::InvalidValue("CHAT_ROOM", e.to_string()))?;
        }

        Ok(config)
    }

    /// Absolute URL of an HTTP endpoint below the API base.
    pub fn endpoint(&self, name: &str) -> String {
        endpoint(&self.api_url, name)
    }
}

/// Join `name` onto `base` the way the web client does (`${API_URL}/name`).
pub fn endpoint(base: &Url, name: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), name)
}

/// Derive the Socket.IO WebSocket URL from the API base URL.
///
/// `http` maps to `ws` and `https` to `wss`. The path is always
/// [`SOCKET_IO_PATH`]. Host and port are kept.
pub fn socket_url(api_url: &Url) -> Result<Url, ConfigError> {
    let scheme = match api_url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    };

    let mut url = api_url.clone();
    url.set_scheme(scheme)
        .map_err(|_| ConfigError::UnsupportedScheme(api_url.scheme().to_string()))?;
    url.set_path(SOCKET_IO_PATH);
    url.set_query(Some(SOCKET_IO_QUERY));
    url.set_fragment(None);
    Ok(url)
}
