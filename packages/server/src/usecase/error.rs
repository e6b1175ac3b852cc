//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{AuthError, StoreError, ValueObjectError};

/// 接続時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("authentication failed: {0}")]
    Unauthorized(#[from] AuthError),
}

/// ルーム購読のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomSubscriptionError {
    #[error("chat '{0}' not found")]
    ChatNotFound(String),

    #[error("user '{user_id}' is not a member of chat '{chat_id}'")]
    NotAMember { chat_id: String, user_id: String },

    #[error("membership lookup failed: {0}")]
    Store(String),
}

impl From<StoreError> for RoomSubscriptionError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ChatNotFound(chat_id) => RoomSubscriptionError::ChatNotFound(chat_id),
            StoreError::NotAMember { chat_id, user_id } => {
                RoomSubscriptionError::NotAMember { chat_id, user_id }
            }
            StoreError::Unavailable(reason) => RoomSubscriptionError::Store(reason),
        }
    }
}

/// 入力中ステータス中継のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayTypingError {
    #[error("user '{user_id}' has not joined chat '{chat_id}'")]
    NotSubscribed { chat_id: String, user_id: String },
}

/// チャットメッセージ送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("message content must not be empty")]
    EmptyContent,

    #[error("message was not persisted: {0}")]
    Persist(#[from] StoreError),
}

/// 通知作成のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateNotificationError {
    #[error("invalid notification: {0}")]
    Invalid(#[from] ValueObjectError),

    #[error("notification was not persisted: {0}")]
    Persist(#[from] StoreError),
}
