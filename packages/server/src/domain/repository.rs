//! Repository / コラボレータ trait 定義
//!
//! ハブが所有する揮発性の状態（ルーム購読表・通話セッション表）と、
//! ハブが利用する外部の永続化機能（メッセージ・通知・チャットメンバー）の
//! インターフェースを定義します。

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::{
    entity::{CallPair, CallSession, CallTransition, Notification, NotificationDraft},
    error::{CallError, StoreError},
    value_object::{MessageId, RoomId, Timestamp, UserId},
};

/// ルーム購読表（`chatID -> 現在購読中のユーザー集合`）
///
/// 「誰がチャットに属しているか」ではなく「誰が今ライブで購読しているか」を表す。
#[async_trait]
pub trait RoomMembershipRepository: Send + Sync {
    /// 購読を追加する（冪等）。新たに追加された場合 `true`。
    async fn join(&self, room_id: RoomId, user_id: UserId) -> bool;

    /// 購読を外す（冪等）。外した場合 `true`。
    async fn leave(&self, room_id: &RoomId, user_id: &UserId) -> bool;

    /// ユーザーを全ルームから外し、外したルームを返す
    async fn leave_all(&self, user_id: &UserId) -> Vec<RoomId>;

    /// ルームの購読者（スナップショット）。未知のルームは空集合。
    async fn members_of(&self, room_id: &RoomId) -> BTreeSet<UserId>;
}

/// 通話セッション表（順序なしペアごとに最大 1 件）
#[async_trait]
pub trait CallSessionRepository: Send + Sync {
    /// ペアにセッションが無ければ追加する
    async fn insert_if_absent(&self, session: CallSession) -> Result<(), CallError>;

    async fn get(&self, pair: &CallPair) -> Option<CallSession>;

    /// ロックを保持したまま遷移を適用する。`Ended` に達したセッションは取り除かれる。
    async fn apply(
        &self,
        pair: &CallPair,
        transition: CallTransition,
    ) -> Result<CallSession, CallError>;

    /// ユーザーが関わる全セッションを強制終了して取り除く
    async fn end_all_involving(&self, user_id: &UserId) -> Vec<CallSession>;

    /// `now` 時点で `max_age_secs` より古い Invited セッションを強制終了して取り除く
    async fn expire_invitations(&self, now: Timestamp, max_age_secs: u64) -> Vec<CallSession>;

    async fn count(&self) -> usize;
}

/// チャット永続化コラボレータ
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// メッセージを永続化して ID を返す（PersistMessage）
    async fn persist_message(
        &self,
        chat_id: &RoomId,
        sender_id: &UserId,
        content: &str,
    ) -> Result<MessageId, StoreError>;

    /// 永続化されたチャットのメンバー（ResolveRoomMembers）
    async fn resolve_room_members(&self, chat_id: &RoomId) -> Result<BTreeSet<UserId>, StoreError>;
}

/// 通知永続化コラボレータ
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// 通知を永続化する（PersistNotification）
    async fn persist_notification(
        &self,
        draft: NotificationDraft,
    ) -> Result<Notification, StoreError>;
}
