//! Credential exchange implementations.

pub mod http;

pub use http::HttpCredentialExchange;
