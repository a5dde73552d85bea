//! UseCase: ログアウト処理

use crate::session::SessionChannel;

/// ログアウトのユースケース
#[derive(Debug, Default, Clone, Copy)]
pub struct LogoutUseCase;

impl LogoutUseCase {
    pub fn new() -> Self {
        Self
    }

    /// ログアウトを実行
    ///
    /// # Returns
    ///
    /// セッションが存在して閉じた場合は `true`
    pub fn execute(&self, current: &mut Option<SessionChannel>) -> bool {
        match current.take() {
            Some(channel) => {
                channel.close();
                tracing::info!("Logged out");
                true
            }
            None => false,
        }
    }
}
