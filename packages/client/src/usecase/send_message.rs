//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 入力テキストの検証と Session Channel への送信
//!
//! ### どのような状況を想定しているか
//! - 正常系：接続中のセッションへの送信
//! - 異常系：未ログイン、空メッセージ

use crate::{
    domain::{ConnectionState, MessageText, OutgoingMessage},
    error::ClientError,
    session::SessionChannel,
};

/// メッセージ送信のユースケース
#[derive(Debug, Default, Clone, Copy)]
pub struct SendMessageUseCase;

impl SendMessageUseCase {
    pub fn new() -> Self {
        Self
    }

    /// メッセージ送信を実行
    ///
    /// 宛先はセッションに設定されたルーム。
    ///
    /// # Arguments
    ///
    /// * `session` - 現在のセッション（未ログインなら `None`）
    /// * `text` - 入力されたテキスト
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 送信キューに積まれた
    /// * `Err(ClientError)` - 未ログイン、入力不正、キュー満杯など
    pub fn execute(
        &self,
        session: Option<&SessionChannel>,
        text: String,
    ) -> Result<(), ClientError> {
        let text = MessageText::new(text)?;
        let Some(session) = session else {
            return Err(ClientError::NotConnected {
                state: ConnectionState::Disconnected,
            });
        };
        session.send(OutgoingMessage::new(session.room().clone(), text))
    }
}
