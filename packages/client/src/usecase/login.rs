//! UseCase: ログイン処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LoginUseCase::execute() メソッド
//! - トークン取得から Session Channel の開始まで
//!
//! ### なぜこのテストが必要か
//! - ログイン失敗時に既存のセッションを壊さないことを保証
//! - クライアントごとにアクティブなセッションは常に 1 つであることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規ログイン、既存セッションからの再ログイン
//! - 異常系：認証失敗、通信失敗

use std::sync::Arc;

use crate::{
    domain::{Credential, CredentialExchange},
    error::ClientError,
    infrastructure::transport::Connector,
    session::{SessionChannel, SessionConfig},
};

/// ログインのユースケース
pub struct LoginUseCase {
    /// トークン取得（HTTP API の抽象化）
    exchange: Arc<dyn CredentialExchange>,
    /// Session Channel のトランスポート
    connector: Arc<dyn Connector>,
    config: SessionConfig,
}

impl LoginUseCase {
    /// 新しい LoginUseCase を作成
    pub fn new(
        exchange: Arc<dyn CredentialExchange>,
        connector: Arc<dyn Connector>,
        config: SessionConfig,
    ) -> Self {
        Self {
            exchange,
            connector,
            config,
        }
    }

    /// ログインを実行
    ///
    /// 認証に成功した場合のみ、既存のセッションを閉じて新しいセッションに置き換える。
    /// `wire` は接続開始前に呼ばれるので、購読をここで登録すれば
    /// `Connecting` からの状態遷移を取りこぼさない。
    ///
    /// # Arguments
    ///
    /// * `credential` - ユーザー名とパスワード（Domain Model）
    /// * `current` - 現在のセッション（成功時に置き換えられる）
    /// * `wire` - 新しいセッションに購読を登録するコールバック
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 認証成功、新しいセッションが接続を開始した
    /// * `Err(ClientError)` - 認証失敗（`current` は変更されない）
    pub async fn execute<F>(
        &self,
        credential: Credential,
        current: &mut Option<SessionChannel>,
        wire: F,
    ) -> Result<(), ClientError>
    where
        F: FnOnce(&SessionChannel),
    {
        // 1. トークン取得（失敗時は既存セッションに触れない）
        let token = self.exchange.authenticate(&credential).await?;

        // 2. 既存セッションを閉じる（トークン 1 つにつきセッション 1 つ）
        if let Some(previous) = current.take() {
            tracing::info!("Closing previous session before switching user");
            previous.close();
        }

        // 3. 新しいセッションを作成して接続開始
        let channel = SessionChannel::new(token, self.config.clone(), self.connector.clone());
        wire(&channel);
        channel.start()?;
        tracing::info!("Session started for '{}'", credential.username);

        *current = Some(channel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionState, MockCredentialExchange, Token},
        test_support::FakeConnector,
    };
    use reqwest::Url;

    fn config() -> SessionConfig {
        SessionConfig::new(Url::parse("ws://chat.test/ws/socket.io/").unwrap())
    }

    fn credential() -> Credential {
        Credential::parse("alice".to_string(), "secret".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_login_starts_session_with_token() {
        // テスト項目: 認証に成功するとトークンでセッションが開始される
        // given (前提条件):
        let mut exchange = MockCredentialExchange::new();
        exchange
            .expect_authenticate()
            .times(1)
            .returning(|_| Ok(Token::new("tok-alice".to_string()).unwrap()));
        let (connector, mut server) = FakeConnector::new();
        let usecase = LoginUseCase::new(Arc::new(exchange), connector, config());
        let mut current = None;

        // when (操作):
        let mut wired = false;
        let result = usecase
            .execute(credential(), &mut current, |_| wired = true)
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert!(wired);
        assert_eq!(
            current.as_ref().map(SessionChannel::state),
            Some(ConnectionState::Connecting)
        );
        let mut conn = server.accept().await;
        assert_eq!(conn.handshake().await, r#"40{"token":"tok-alice"}"#);
    }

    #[tokio::test]
    async fn test_login_failure_keeps_current_session() {
        // テスト項目: 認証に失敗しても既存のセッションはそのまま残る
        // given (前提条件):
        let mut exchange = MockCredentialExchange::new();
        exchange.expect_authenticate().times(1).returning(|_| {
            Err(ClientError::Authentication {
                status: 401,
                detail: "Incorrect credentials".to_string(),
            })
        });
        let (connector, _server) = FakeConnector::new();
        let existing = SessionChannel::new(
            Token::new("tok-old".to_string()).unwrap(),
            config(),
            connector.clone(),
        );
        let usecase = LoginUseCase::new(Arc::new(exchange), connector, config());
        let mut current = Some(existing);

        // when (操作):
        let result = usecase.execute(credential(), &mut current, |_| {}).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(ClientError::Authentication { status: 401, .. })
        ));
        assert_eq!(
            current.as_ref().map(SessionChannel::state),
            Some(ConnectionState::Disconnected)
        );
    }

    #[tokio::test]
    async fn test_relogin_closes_previous_session() {
        // テスト項目: 再ログインすると以前のセッションが閉じられる
        // given (前提条件):
        let mut exchange = MockCredentialExchange::new();
        exchange
            .expect_authenticate()
            .times(1)
            .returning(|_| Ok(Token::new("tok-new".to_string()).unwrap()));
        let (connector, _server) = FakeConnector::new();
        let previous = SessionChannel::new(
            Token::new("tok-old".to_string()).unwrap(),
            config(),
            connector.clone(),
        );
        let previous_state = previous.watch_state();
        let usecase = LoginUseCase::new(Arc::new(exchange), connector, config());
        let mut current = Some(previous);

        // when (操作):
        usecase
            .execute(credential(), &mut current, |_| {})
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(*previous_state.borrow(), ConnectionState::Closed);
        assert_eq!(
            current.as_ref().map(SessionChannel::state),
            Some(ConnectionState::Connecting)
        );
    }

    #[tokio::test]
    async fn test_login_transport_failure() {
        // テスト項目: 通信失敗はそのまま呼び出し元に返される
        // given (前提条件):
        let mut exchange = MockCredentialExchange::new();
        exchange
            .expect_authenticate()
            .returning(|_| Err(ClientError::Transport("connection refused".to_string())));
        let (connector, _server) = FakeConnector::new();
        let usecase = LoginUseCase::new(Arc::new(exchange), connector, config());
        let mut current = None;

        // when (操作):
        let result = usecase.execute(credential(), &mut current, |_| {}).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert!(current.is_none());
    }
}
