//! UseCase 層
//!
//! ユーザーの操作（ログイン、登録、送信、ログアウト）を実装するレイヤー。
//! UI 層から呼び出され、Domain 層と Session Channel を操作します。

pub mod login;
pub mod logout;
pub mod register;
pub mod send_message;

pub use login::LoginUseCase;
pub use logout::LogoutUseCase;
pub use register::RegisterUseCase;
pub use send_message::SendMessageUseCase;
