//! UseCase: ユーザー登録処理

use std::sync::Arc;

use crate::{
    domain::{Credential, CredentialExchange},
    error::ClientError,
};

/// ユーザー登録のユースケース
///
/// 登録だけを行い、ログインはしない。
pub struct RegisterUseCase {
    exchange: Arc<dyn CredentialExchange>,
}

impl RegisterUseCase {
    /// 新しい RegisterUseCase を作成
    pub fn new(exchange: Arc<dyn CredentialExchange>) -> Self {
        Self { exchange }
    }

    /// ユーザー登録を実行
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 登録成功
    /// * `Err(ClientError::Registration)` - 既に存在するユーザーなど
    pub async fn execute(&self, credential: Credential) -> Result<(), ClientError> {
        self.exchange.register(&credential).await
    }
}
