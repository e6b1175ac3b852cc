//! WebSocket を使った ConnectionRegistry 実装
//!
//! ## 責務
//!
//! - `userID -> 接続` の対応表の管理（1 ユーザーにつき最大 1 接続）
//! - フレームの JSON エンコードと送信時タイムスタンプの付与
//! - 送信に失敗した接続の後始末
//!
//! ## ロックの扱い
//!
//! 対応表は `RwLock` で守られる（送信・参照は read、登録・解除は write）。
//! 送信は対応表のロックを解放してから行う。ソケットへの書き込みそのものは
//! 接続ごとの書き込みタスク（UI 層）が直列化する。

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use gymates_hub_shared::time::Clock;
use tokio::sync::RwLock;

use crate::{
    domain::{
        ConnectionId, ConnectionRegistry, OutboundFrame, Outbox, Registration, Timestamp,
        Unregistration, UserId,
    },
    infrastructure::dto::websocket::ServerFrame,
};

/// 登録済みの接続 1 件
struct ConnectionEntry {
    connection_id: ConnectionId,
    outbox: Outbox,
}

/// WebSocket を使った ConnectionRegistry 実装
pub struct WebSocketConnectionRegistry {
    /// Key: user_id, Value: 現在の接続
    connections: RwLock<HashMap<UserId, ConnectionEntry>>,
    /// 送信時タイムスタンプの取得元
    clock: Arc<dyn Clock>,
}

impl WebSocketConnectionRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// 送信時刻を付与して JSON にする
    fn encode(&self, frame: &OutboundFrame) -> Option<String> {
        let sent_at = Timestamp::new(self.clock.now_unix_secs());
        match serde_json::to_string(&ServerFrame::from_outbound(frame, sent_at)) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to encode {}: {}", frame, e);
                None
            }
        }
    }

    /// 1 接続へ送る。受信側が閉じていればその接続を取り除く。
    async fn deliver(
        &self,
        user_id: &UserId,
        connection_id: ConnectionId,
        outbox: &Outbox,
        json: String,
    ) -> bool {
        if outbox.send(json).is_err() {
            tracing::warn!(
                "Outbox of '{}' (connection {}) is closed, tearing the connection down",
                user_id,
                connection_id
            );
            self.unregister_connection(user_id, connection_id).await;
            return false;
        }
        true
    }
}

#[async_trait]
impl ConnectionRegistry for WebSocketConnectionRegistry {
    async fn register(&self, user_id: UserId, outbox: Outbox) -> Registration {
        let connection_id = ConnectionId::generate();
        let previous = {
            let mut connections = self.connections.write().await;
            connections.insert(
                user_id.clone(),
                ConnectionEntry {
                    connection_id,
                    outbox,
                },
            )
        };

        // 旧接続の Outbox を落とすと、その書き込みタスクは残りを流し切って終了する
        let replaced = match previous {
            Some(old) => {
                tracing::info!(
                    "Connection {} of '{}' replaced by {}",
                    old.connection_id,
                    user_id,
                    connection_id
                );
                true
            }
            None => false,
        };

        tracing::debug!("User '{}' registered (connection {})", user_id, connection_id);
        Registration {
            connection_id,
            replaced,
        }
    }

    async fn unregister(&self, user_id: &UserId) -> bool {
        let removed = self.connections.write().await.remove(user_id).is_some();
        if removed {
            tracing::debug!("User '{}' unregistered", user_id);
        }
        removed
    }

    async fn unregister_connection(
        &self,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> Unregistration {
        let mut connections = self.connections.write().await;
        match connections.get(user_id) {
            None => Unregistration::AlreadyAbsent,
            Some(entry) if entry.connection_id != connection_id => Unregistration::Superseded,
            Some(_) => {
                connections.remove(user_id);
                tracing::debug!(
                    "User '{}' unregistered (connection {})",
                    user_id,
                    connection_id
                );
                Unregistration::Removed
            }
        }
    }

    async fn send_to(&self, user_id: &UserId, frame: &OutboundFrame) -> bool {
        let target = {
            let connections = self.connections.read().await;
            connections
                .get(user_id)
                .map(|entry| (entry.connection_id, entry.outbox.clone()))
        };

        let Some((connection_id, outbox)) = target else {
            tracing::debug!("'{}' is offline, {} not delivered", user_id, frame);
            return false;
        };

        let Some(json) = self.encode(frame) else {
            return false;
        };

        let delivered = self.deliver(user_id, connection_id, &outbox, json).await;
        if delivered {
            tracing::debug!("Pushed {} to '{}'", frame, user_id);
        }
        delivered
    }

    async fn broadcast_except(&self, excluded: &UserId, frame: &OutboundFrame) -> usize {
        let targets: Vec<(UserId, ConnectionId, Outbox)> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .filter(|(user_id, _)| *user_id != excluded)
                .map(|(user_id, entry)| {
                    (user_id.clone(), entry.connection_id, entry.outbox.clone())
                })
                .collect()
        };

        if targets.is_empty() {
            return 0;
        }

        let Some(json) = self.encode(frame) else {
            return 0;
        };

        // 一部の送信失敗はブロードキャスト全体を止めない
        let mut delivered = 0;
        for (user_id, connection_id, outbox) in targets {
            if self
                .deliver(&user_id, connection_id, &outbox, json.clone())
                .await
            {
                delivered += 1;
            }
        }

        tracing::debug!(
            "Broadcasted {} to {} connection(s) except '{}'",
            frame,
            delivered,
            excluded
        );
        delivered
    }

    async fn list_online(&self) -> BTreeSet<UserId> {
        self.connections.read().await.keys().cloned().collect()
    }

    async fn is_online(&self, user_id: &UserId) -> bool {
        self.connections.read().await.contains_key(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymates_hub_shared::time::FixedClock;
    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 登録・置き換え・解除（接続 ID 付き解除を含む）
    // - send_to / broadcast_except の配送と送信時刻の付与
    // - 受信側が閉じた接続の後始末
    //
    // 【なぜこのテストが必要か】
    // - 1 ユーザー 1 接続の不変条件を保証する必要がある
    // - 置き換えられた旧接続の切断処理が新接続を消してはならない
    // - 壊れた接続がブロードキャストを止めてはならない
    // ========================================

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn create_test_registry() -> WebSocketConnectionRegistry {
        WebSocketConnectionRegistry::new(Arc::new(FixedClock::new(1_700_000_000)))
    }

    fn parse(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_send_to_registered_user() {
        // テスト項目: 登録済みユーザーにフレームが届き、送信時刻が付与される
        // given (前提条件):
        let registry = create_test_registry();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(user("alice"), tx).await;

        // when (操作):
        let delivered = registry
            .send_to(&user("alice"), &OutboundFrame::online_status(user("bob"), true))
            .await;

        // then (期待する結果):
        assert!(delivered);
        let received = parse(&rx.recv().await.unwrap());
        assert_eq!(
            received,
            json!({"type":"online_status","user_id":"bob","is_online":true,"timestamp":1_700_000_000})
        );
    }

    #[tokio::test]
    async fn test_send_to_offline_user_is_not_an_error() {
        // テスト項目: 未接続ユーザーへの送信は false を返すだけ
        // given (前提条件):
        let registry = create_test_registry();

        // when (操作):
        let delivered = registry
            .send_to(&user("ghost"), &OutboundFrame::online_status(user("bob"), true))
            .await;

        // then (期待する結果):
        assert!(!delivered);
    }

    #[tokio::test]
    async fn test_register_replaces_previous_connection() {
        // テスト項目: 同じユーザーの再接続で旧接続が置き換えられ、旧 Outbox は閉じる
        // given (前提条件):
        let registry = create_test_registry();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        let first = registry.register(user("alice"), old_tx).await;

        // when (操作):
        let second = registry.register(user("alice"), new_tx).await;
        registry
            .send_to(&user("alice"), &OutboundFrame::online_status(user("bob"), true))
            .await;

        // then (期待する結果):
        assert!(!first.replaced);
        assert!(second.replaced);
        assert_ne!(first.connection_id, second.connection_id);
        assert_eq!(registry.list_online().await.len(), 1);
        assert!(old_rx.recv().await.is_none());
        assert!(new_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_stale_connection_cannot_unregister_its_replacement() {
        // テスト項目: 置き換え済みの旧接続 ID では新接続を解除できない
        // given (前提条件):
        let registry = create_test_registry();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, _new_rx) = mpsc::unbounded_channel();
        let old = registry.register(user("alice"), old_tx).await;
        let new = registry.register(user("alice"), new_tx).await;

        // when (操作):
        let stale = registry
            .unregister_connection(&user("alice"), old.connection_id)
            .await;

        // then (期待する結果):
        assert_eq!(stale, Unregistration::Superseded);
        assert!(registry.is_online(&user("alice")).await);
        assert_eq!(
            registry
                .unregister_connection(&user("alice"), new.connection_id)
                .await,
            Unregistration::Removed
        );
        assert!(!registry.is_online(&user("alice")).await);
    }

    #[tokio::test]
    async fn test_unregister_after_send_failure_reports_already_absent() {
        // テスト項目: 送信失敗で取り除かれた接続の解除は AlreadyAbsent になり、置き換えとは区別される
        // given (前提条件):
        let registry = create_test_registry();
        let (tx, rx) = mpsc::unbounded_channel();
        let registration = registry.register(user("alice"), tx).await;
        drop(rx);
        let delivered = registry
            .send_to(&user("alice"), &OutboundFrame::online_status(user("bob"), true))
            .await;

        // when (操作):
        let result = registry
            .unregister_connection(&user("alice"), registration.connection_id)
            .await;

        // then (期待する結果):
        assert!(!delivered);
        assert_eq!(result, Unregistration::AlreadyAbsent);
        assert!(result.was_current());
        assert!(!Unregistration::Superseded.was_current());
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        // テスト項目: 解除は冪等で、2 回目は false を返す
        // given (前提条件):
        let registry = create_test_registry();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register(user("alice"), tx).await;

        // when (操作):
        let first = registry.unregister(&user("alice")).await;
        let second = registry.unregister(&user("alice")).await;

        // then (期待する結果):
        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn test_broadcast_except_skips_excluded_user() {
        // テスト項目: ブロードキャストは除外ユーザー以外の全員に届く
        // given (前提条件):
        let registry = create_test_registry();
        let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        let (charlie_tx, mut charlie_rx) = mpsc::unbounded_channel();
        registry.register(user("alice"), alice_tx).await;
        registry.register(user("bob"), bob_tx).await;
        registry.register(user("charlie"), charlie_tx).await;

        // when (操作):
        let delivered = registry
            .broadcast_except(&user("alice"), &OutboundFrame::online_status(user("alice"), true))
            .await;

        // then (期待する結果):
        assert_eq!(delivered, 2);
        assert!(bob_rx.recv().await.is_some());
        assert!(charlie_rx.recv().await.is_some());
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_tears_down_closed_connection_and_continues() {
        // テスト項目: 受信側が閉じた接続は取り除かれ、他の接続への配送は続く
        // given (前提条件):
        let registry = create_test_registry();
        let (bob_tx, bob_rx) = mpsc::unbounded_channel();
        let (charlie_tx, mut charlie_rx) = mpsc::unbounded_channel();
        registry.register(user("bob"), bob_tx).await;
        registry.register(user("charlie"), charlie_tx).await;
        drop(bob_rx);

        // when (操作):
        let delivered = registry
            .broadcast_except(&user("alice"), &OutboundFrame::online_status(user("alice"), false))
            .await;

        // then (期待する結果):
        assert_eq!(delivered, 1);
        assert!(charlie_rx.recv().await.is_some());
        assert!(!registry.is_online(&user("bob")).await);
        assert!(registry.is_online(&user("charlie")).await);
    }

    #[tokio::test]
    async fn test_list_online_is_sorted_snapshot() {
        // テスト項目: オンライン一覧はソート済みのスナップショット
        // given (前提条件):
        let registry = create_test_registry();
        for id in ["charlie", "alice", "bob"] {
            let (tx, _rx) = mpsc::unbounded_channel();
            registry.register(user(id), tx).await;
        }

        // when (操作):
        let online: Vec<String> = registry
            .list_online()
            .await
            .into_iter()
            .map(UserId::into_string)
            .collect();

        // then (期待する結果):
        assert_eq!(online, vec!["alice", "bob", "charlie"]);
    }
}
