//! Ports implemented by the infrastructure layer.

use async_trait::async_trait;

use super::{entity::Credential, value_object::Token};
use crate::error::ClientError;

/// One-shot exchange of credentials for a bearer token.
///
/// Implementations never retry and never open the session channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    /// Exchange `credential` for a token.
    ///
    /// # Errors
    ///
    /// * `ClientError::Transport` - the endpoint could not be reached
    /// * `ClientError::Authentication` - the endpoint refused the credentials
    /// * `ClientError::Protocol` - the response body was not understood
    async fn authenticate(&self, credential: &Credential) -> Result<Token, ClientError>;

    /// Create a new account. Does not log in.
    async fn register(&self, credential: &Credential) -> Result<(), ClientError>;
}
