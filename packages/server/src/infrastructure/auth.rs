//! Authenticator 実装
//!
//! - `QueryParamAuthenticator`: `user_id` クエリパラメータをそのまま信頼する（開発用）
//! - `StaticTokenAuthenticator`: 事前に配布したトークンとユーザー ID の対応表で照合する

use std::collections::HashMap;

use crate::domain::{AuthError, Authenticator, Credentials, UserId};

/// `user_id` をそのまま採用する Authenticator
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParamAuthenticator;

impl Authenticator for QueryParamAuthenticator {
    fn authenticate(&self, credentials: &Credentials) -> Result<UserId, AuthError> {
        let raw = credentials
            .user_id
            .as_deref()
            .ok_or(AuthError::MissingCredentials)?;
        Ok(UserId::new(raw.to_string())?)
    }
}

/// トークン表で照合する Authenticator
///
/// 提示された `user_id` は無視し、トークンに紐づくユーザー ID を採用する。
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenAuthenticator {
    pub fn new(tokens: HashMap<String, UserId>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(&self, credentials: &Credentials) -> Result<UserId, AuthError> {
        let token = credentials
            .token
            .as_deref()
            .ok_or(AuthError::MissingCredentials)?;
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)
    }
}
