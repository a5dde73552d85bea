//! HTTP API DTOs.

use serde::Deserialize;
use serde_json::Value;

/// Response of `POST /token`.
///
/// Fields are optional so that a missing `access_token` is reported as a
/// protocol error instead of a JSON decode error.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Response of `POST /register`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub msg: Option<String>,
}

/// Error body returned by the API (`{"detail": ...}`).
///
/// `detail` is a string for handled errors and a list for request validation
/// errors.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub detail: Value,
}

impl ErrorResponse {
    /// Human readable form of `detail`.
    pub fn detail_text(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
