//! UseCase: ユーザー接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectUserUseCase::authenticate() / execute()
//!
//! ### なぜこのテストが必要か
//! - 接続のユーザー ID は認証でのみ決まり、クライアントの申告で上書きされないことを保証
//! - 登録時にオンライン通知が他の全接続へ届くことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規接続、オンライン一覧の取得
//! - 異常系：資格情報なし
//! - エッジケース：同じユーザーの二重接続（置き換え）、切断処理中の再接続

use std::{collections::BTreeSet, sync::Arc};

use crate::domain::{
    Authenticator, ConnectionRegistry, Credentials, OutboundFrame, Outbox, Registration, UserId,
};

use super::{error::ConnectError, session_gate::UserSessionGate};

/// 接続直後の状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedUser {
    pub user_id: UserId,
    pub registration: Registration,
    /// 登録直後のオンライン一覧（自分を含む）
    pub online_users: BTreeSet<UserId>,
}

/// ユーザー接続のユースケース
pub struct ConnectUserUseCase {
    authenticator: Arc<dyn Authenticator>,
    registry: Arc<dyn ConnectionRegistry>,
    /// 同じユーザーの切断処理との直列化
    gate: Arc<UserSessionGate>,
}

impl ConnectUserUseCase {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        registry: Arc<dyn ConnectionRegistry>,
        gate: Arc<UserSessionGate>,
    ) -> Self {
        Self {
            authenticator,
            registry,
            gate,
        }
    }

    /// アップグレード前に接続のユーザー ID を確定する
    pub fn authenticate(&self, credentials: &Credentials) -> Result<UserId, ConnectError> {
        Ok(self.authenticator.authenticate(credentials)?)
    }

    /// 接続を登録し、他の全接続へオンライン通知を送る
    ///
    /// 同じユーザーの切断処理が進行中なら、その後始末が終わるまで待つ。
    ///
    /// # Arguments
    ///
    /// * `user_id` - 認証済みのユーザー ID
    /// * `outbox` - この接続の書き込みタスクへの送信経路
    pub async fn execute(&self, user_id: UserId, outbox: Outbox) -> ConnectedUser {
        let _guard = self.gate.enter(&user_id).await;

        // 1. 登録（既存の接続は置き換えられる）
        let registration = self.registry.register(user_id.clone(), outbox).await;

        // 2. プレゼンス通知
        let notified = self
            .registry
            .broadcast_except(&user_id, &OutboundFrame::online_status(user_id.clone(), true))
            .await;
        tracing::info!(
            "User '{}' connected (connection {}, replaced: {}, presence sent to {})",
            user_id,
            registration.connection_id,
            registration.replaced,
            notified
        );

        let online_users = self.registry.list_online().await;
        ConnectedUser {
            user_id,
            registration,
            online_users,
        }
    }
}
