//! 接続時の本人確認
//!
//! 接続に紐づくユーザー ID はここで一度だけ決まり、以降のフレームでは上書きされない。

use super::{error::AuthError, value_object::UserId};

/// アップグレード要求で提示された資格情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, credentials: &Credentials) -> Result<UserId, AuthError>;
}
