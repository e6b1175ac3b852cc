//! ドメイン層のエラー定義

use thiserror::Error;

use super::entity::CallState;

/// 値オブジェクト生成時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("identifier must not be empty")]
    EmptyIdentifier,

    #[error("identifier is too long ({actual} > {max} characters)")]
    IdentifierTooLong { max: usize, actual: usize },

    #[error("identifier must not contain control characters")]
    ControlCharacter,
}

/// 通話シグナリングの状態遷移エラー
///
/// いずれもプロトコルの誤用であり、接続は維持される。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("a user cannot call themselves")]
    SelfCall,

    #[error("a call session between these users already exists")]
    SessionAlreadyExists,

    #[error("no call session exists between these users")]
    SessionNotFound,

    #[error("call session is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: CallState,
        actual: CallState,
    },

    #[error("only the callee can answer an invitation")]
    NotCallee,

    #[error("illegal call transition from {from:?} to {to:?}")]
    IllegalTransition { from: CallState, to: CallState },
}

/// 外部の永続化コラボレータ（チャット・通知）が返すエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("chat '{0}' not found")]
    ChatNotFound(String),

    #[error("user '{user_id}' is not a member of chat '{chat_id}'")]
    NotAMember { chat_id: String, user_id: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// 接続時の本人確認エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no credentials were presented")]
    MissingCredentials,

    #[error("credentials were rejected")]
    InvalidCredentials,

    #[error("invalid user id: {0}")]
    InvalidUserId(#[from] ValueObjectError),
}
