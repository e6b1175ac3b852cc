//! 接続レジストリ trait 定義
//!
//! `userID -> 接続` の対応表を所有し、接続ごとの送信経路にフレームを渡します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## ロック順序
//!
//! 実装は対応表のロックを保持したまま送信を待ってはならない。
//! 送信先の `Outbox` をスナップショットしてからロックを解放し、その後に送信する。

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    frame::OutboundFrame,
    value_object::{ConnectionId, UserId},
};

/// 接続ごとの送信経路
///
/// 受信側は接続ごとに 1 つの書き込みタスクが保持し、ソケットへの書き込みを直列化する。
pub type Outbox = mpsc::UnboundedSender<String>;

/// `register` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub connection_id: ConnectionId,
    /// 同じユーザーの既存接続を置き換えたか
    pub replaced: bool,
}

/// `unregister_connection` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unregistration {
    /// 現在の接続だったので取り除いた
    Removed,
    /// 既に取り除かれていた（送信失敗による後始末など）
    AlreadyAbsent,
    /// 同じユーザーの別の接続が現在の接続になっている
    Superseded,
}

impl Unregistration {
    /// この接続の切断でユーザーの後始末をすべきか
    pub fn was_current(&self) -> bool {
        !matches!(self, Unregistration::Superseded)
    }
}

#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// 接続を登録する。同じユーザーの既存接続は置き換えられ、独立して閉じられる。
    async fn register(&self, user_id: UserId, outbox: Outbox) -> Registration;

    /// ユーザーの接続を取り除く（冪等）。取り除いた場合 `true`。
    async fn unregister(&self, user_id: &UserId) -> bool;

    /// 指定した接続がまだ現在の接続である場合に限り取り除く。
    async fn unregister_connection(
        &self,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> Unregistration;

    /// ユーザーにフレームを送る。接続が無ければ `false`（エラーではない）。
    async fn send_to(&self, user_id: &UserId, frame: &OutboundFrame) -> bool;

    /// `excluded` 以外の全接続に送る。送れた接続数を返す。
    async fn broadcast_except(&self, excluded: &UserId, frame: &OutboundFrame) -> usize;

    /// オンラインのユーザー一覧（呼び出し時点のスナップショット）
    async fn list_online(&self) -> BTreeSet<UserId>;

    async fn is_online(&self, user_id: &UserId) -> bool;
}
