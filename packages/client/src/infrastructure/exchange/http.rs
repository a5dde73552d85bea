//! Credential exchange over the HTTP API (`POST /token`, `POST /register`).

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use crate::{
    config::endpoint,
    domain::{Credential, CredentialExchange, Token},
    error::ClientError,
    infrastructure::dto::http::{ErrorResponse, RegisterResponse, TokenResponse},
};

/// [`CredentialExchange`] backed by `reqwest`.
///
/// Credentials are sent form-encoded (`username`, `password`). There is no
/// retry: every failure is reported to the caller as-is.
#[derive(Debug, Clone)]
pub struct HttpCredentialExchange {
    client: reqwest::Client,
    token_url: String,
    register_url: String,
}

impl HttpCredentialExchange {
    /// Create an exchange talking to the API at `api_url`.
    pub fn new(api_url: &Url) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Same as [`new`](Self::new) with a preconfigured HTTP client.
    pub fn with_client(client: reqwest::Client, api_url: &Url) -> Self {
        Self {
            client,
            token_url: endpoint(api_url, "token"),
            register_url: endpoint(api_url, "register"),
        }
    }

    async fn post_credential(
        &self,
        url: &str,
        credential: &Credential,
    ) -> Result<(StatusCode, String), ClientError> {
        let form = [
            ("username", credential.username.as_str()),
            ("password", credential.password.as_str()),
        ];
        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok((status, body))
    }
}

/// Extract the `detail` message of an error body, falling back to the raw
/// body or the status reason.
fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
        return error.detail_text();
    }
    if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}

#[async_trait]
impl CredentialExchange for HttpCredentialExchange {
    async fn authenticate(&self, credential: &Credential) -> Result<Token, ClientError> {
        tracing::debug!(url = %self.token_url, "Requesting token for '{}'", credential.username);
        let (status, body) = self.post_credential(&self.token_url, credential).await?;

        if !status.is_success() {
            let detail = error_detail(status, &body);
            tracing::warn!(status = status.as_u16(), "Token request rejected: {}", detail);
            return Err(ClientError::Authentication {
                status: status.as_u16(),
                detail,
            });
        }

        let response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ClientError::Protocol(format!("invalid token response: {e}")))?;
        let access_token = response
            .access_token
            .ok_or_else(|| ClientError::Protocol("token response has no access_token".into()))?;
        let token = Token::new(access_token)
            .map_err(|_| ClientError::Protocol("token response has an empty access_token".into()))?;

        if let Some(kind) = response.token_type.as_deref()
            && !kind.eq_ignore_ascii_case("bearer")
        {
            tracing::debug!("Unexpected token_type '{}', using token as-is", kind);
        }

        tracing::info!("Authenticated as '{}'", credential.username);
        Ok(token)
    }

    async fn register(&self, credential: &Credential) -> Result<(), ClientError> {
        tracing::debug!(url = %self.register_url, "Registering '{}'", credential.username);
        let (status, body) = self.post_credential(&self.register_url, credential).await?;

        if !status.is_success() {
            let detail = error_detail(status, &body);
            tracing::warn!(status = status.as_u16(), "Registration rejected: {}", detail);
            return Err(ClientError::Registration {
                status: status.as_u16(),
                detail,
            });
        }

        let message = serde_json::from_str::<RegisterResponse>(&body)
            .ok()
            .and_then(|r| r.msg)
            .unwrap_or_else(|| "registered".to_string());
        tracing::info!("Registered '{}': {}", credential.username, message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_from_json() {
        // テスト項目: JSON の detail がエラーメッセージとして使われる
        // when (操作):
        let detail = error_detail(StatusCode::UNAUTHORIZED, r#"{"detail":"Incorrect credentials"}"#);

        // then (期待する結果):
        assert_eq!(detail, "Incorrect credentials");
    }

    #[test]
    fn test_error_detail_from_plain_body() {
        // テスト項目: JSON でない本文はそのまま使われる
        // when (操作):
        let detail = error_detail(StatusCode::BAD_GATEWAY, "upstream down\n");

        // then (期待する結果):
        assert_eq!(detail, "upstream down");
    }

    #[test]
    fn test_error_detail_from_status() {
        // テスト項目: 本文が空ならステータスの説明が使われる
        // when (操作):
        let detail = error_detail(StatusCode::UNAUTHORIZED, "");

        // then (期待する結果):
        assert_eq!(detail, "Unauthorized");
    }

    #[test]
    fn test_endpoints() {
        // テスト項目: API URL からエンドポイントが組み立てられる
        // given (前提条件):
        let api_url = Url::parse("http://localhost:8000").unwrap();

        // when (操作):
        let exchange = HttpCredentialExchange::new(&api_url);

        // then (期待する結果):
        assert_eq!(exchange.token_url, "http://localhost:8000/token");
        assert_eq!(exchange.register_url, "http://localhost:8000/register");
    }
}
