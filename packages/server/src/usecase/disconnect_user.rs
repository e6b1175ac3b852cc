//! UseCase: ユーザー切断処理
//!
//! 接続の後始末は次の順で行う。
//!
//! 1. 接続の登録解除（まだ現在の接続である場合のみ）
//! 2. 全ルームからの購読解除
//! 3. ユーザーが関わる全通話の強制終了（相手へ `video_call_end`）
//! 4. オフライン通知
//!
//! 置き換えられた古い接続の切断では 1 で止まり、新しい接続には何も影響しない。
//! 送信失敗で既にレジストリから外れていた接続は、置き換えではないので 2〜4 を行う。
//! 1〜4 は [`UserSessionGate`] の下で実行し、同じユーザーの再接続はその完了を待つ。

use std::sync::Arc;

use crate::domain::{
    CallEndReason, ConnectionId, ConnectionRegistry, OutboundFrame, RoomId,
    RoomMembershipRepository, Unregistration, UserId,
};

use super::{call_signaling::CallSignalingUseCase, session_gate::UserSessionGate};

/// 切断処理の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectOutcome {
    /// 現在の接続として後始末されたか（置き換え済みなら `false`）
    pub unregistered: bool,
    pub left_rooms: Vec<RoomId>,
    pub ended_calls: usize,
}

/// ユーザー切断のユースケース
pub struct DisconnectUserUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    rooms: Arc<dyn RoomMembershipRepository>,
    call_signaling: Arc<CallSignalingUseCase>,
    gate: Arc<UserSessionGate>,
}

impl DisconnectUserUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        rooms: Arc<dyn RoomMembershipRepository>,
        call_signaling: Arc<CallSignalingUseCase>,
        gate: Arc<UserSessionGate>,
    ) -> Self {
        Self {
            registry,
            rooms,
            call_signaling,
            gate,
        }
    }

    pub async fn execute(&self, user_id: &UserId, connection_id: ConnectionId) -> DisconnectOutcome {
        let _guard = self.gate.enter(user_id).await;

        let unregistration = self
            .registry
            .unregister_connection(user_id, connection_id)
            .await;
        if !unregistration.was_current() {
            tracing::info!(
                "Connection {} of '{}' closed after being replaced",
                connection_id,
                user_id
            );
            return DisconnectOutcome::default();
        }
        if unregistration == Unregistration::AlreadyAbsent {
            tracing::debug!(
                "Connection {} of '{}' was already torn down by a failed send",
                connection_id,
                user_id
            );
        }

        let left_rooms = self.rooms.leave_all(user_id).await;
        let ended_calls = self
            .call_signaling
            .end_all_for(user_id, CallEndReason::PeerDisconnected)
            .await;
        self.registry
            .broadcast_except(user_id, &OutboundFrame::online_status(user_id.clone(), false))
            .await;

        tracing::info!(
            "User '{}' disconnected (left {} rooms, ended {} calls)",
            user_id,
            left_rooms.len(),
            ended_calls
        );
        DisconnectOutcome {
            unregistered: true,
            left_rooms,
            ended_calls,
        }
    }
}

#[cfg(test)]
mod tests {
    use gymates_hub_shared::time::FixedClock;
    use serde_json::{Map, Value};
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        domain::CallSessionRepository,
        infrastructure::{
            registry::WebSocketConnectionRegistry,
            repository::{InMemoryCallSessionRepository, InMemoryRoomMembershipRepository},
        },
    };

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    struct Fixture {
        registry: Arc<WebSocketConnectionRegistry>,
        rooms: Arc<InMemoryRoomMembershipRepository>,
        calls: Arc<InMemoryCallSessionRepository>,
        call_signaling: Arc<CallSignalingUseCase>,
        usecase: DisconnectUserUseCase,
    }

    fn setup() -> Fixture {
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let registry = Arc::new(WebSocketConnectionRegistry::new(clock.clone()));
        let rooms = Arc::new(InMemoryRoomMembershipRepository::new());
        let calls = Arc::new(InMemoryCallSessionRepository::new());
        let call_signaling = Arc::new(CallSignalingUseCase::new(
            calls.clone(),
            registry.clone(),
            clock,
        ));
        let usecase = DisconnectUserUseCase::new(
            registry.clone(),
            rooms.clone(),
            call_signaling.clone(),
            Arc::new(UserSessionGate::new()),
        );
        Fixture {
            registry,
            rooms,
            calls,
            call_signaling,
            usecase,
        }
    }

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 通話中のユーザーが切断すると、相手に video_call_end が 1 通だけ届く
    // - ルーム購読が外れ、オフライン通知が送られる
    // 【どのような状況を想定しているか】
    // - alice と bob が r1 を購読し、通話中（Active）
    // - alice が切断
    // ========================================
    #[tokio::test]
    async fn test_disconnect_cleans_up_rooms_calls_and_presence() {
        // given (前提条件):
        let f = setup();
        let (alice_tx, _alice_rx) = mpsc::unbounded_channel();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        let alice = f.registry.register(user("alice"), alice_tx).await;
        f.registry.register(user("bob"), bob_tx).await;
        f.rooms.join(room("r1"), user("alice")).await;
        f.rooms.join(room("r1"), user("bob")).await;
        f.call_signaling
            .invite(&user("alice"), &user("bob"), Map::new())
            .await
            .unwrap();
        f.call_signaling
            .accept(&user("bob"), &user("alice"), Map::new())
            .await
            .unwrap();
        // 招待フレームを読み捨てる
        bob_rx.recv().await.unwrap();

        // when (操作):
        let outcome = f.usecase.execute(&user("alice"), alice.connection_id).await;

        // then (期待する結果):
        assert!(outcome.unregistered);
        assert_eq!(outcome.left_rooms, vec![room("r1")]);
        assert_eq!(outcome.ended_calls, 1);
        assert_eq!(f.calls.count().await, 0);

        let end: Value = serde_json::from_str(&bob_rx.recv().await.unwrap()).unwrap();
        assert_eq!(end["type"], "video_call_end");
        assert_eq!(end["user_id"], "alice");
        assert_eq!(end["data"]["reason"], "peer_disconnected");

        let presence: Value = serde_json::from_str(&bob_rx.recv().await.unwrap()).unwrap();
        assert_eq!(presence["type"], "online_status");
        assert_eq!(presence["is_online"], false);
        assert!(bob_rx.try_recv().is_err());
        assert!(!f.registry.is_online(&user("alice")).await);
    }

    #[tokio::test]
    async fn test_replaced_connection_does_not_clean_up() {
        // テスト項目: 置き換えられた古い接続の切断は、新しい接続の状態を壊さない
        // given (前提条件):
        let f = setup();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let old = f.registry.register(user("alice"), old_tx).await;
        let (new_tx, _new_rx) = mpsc::unbounded_channel();
        f.registry.register(user("alice"), new_tx).await;
        f.rooms.join(room("r1"), user("alice")).await;

        // when (操作):
        let outcome = f.usecase.execute(&user("alice"), old.connection_id).await;

        // then (期待する結果):
        assert_eq!(outcome, DisconnectOutcome::default());
        assert!(f.registry.is_online(&user("alice")).await);
        assert_eq!(f.rooms.members_of(&room("r1")).await.len(), 1);
    }

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 書き込みタスクが先に死に、送信失敗でレジストリから外れた接続の切断でも
    //   ルーム購読・通話・プレゼンスの後始末が行われる
    // 【どのような状況を想定しているか】
    // - alice と bob が r1 を購読し、通話中（Active）
    // - alice の受信側が閉じ、bob からの送信で alice の接続が取り除かれる
    // - その後に alice の接続の切断処理が走る
    // ========================================
    #[tokio::test]
    async fn test_disconnect_after_send_failure_still_cleans_up() {
        // given (前提条件):
        let f = setup();
        let (alice_tx, alice_rx) = mpsc::unbounded_channel();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        let alice = f.registry.register(user("alice"), alice_tx).await;
        f.registry.register(user("bob"), bob_tx).await;
        f.rooms.join(room("r1"), user("alice")).await;
        f.rooms.join(room("r1"), user("bob")).await;
        f.call_signaling
            .invite(&user("alice"), &user("bob"), Map::new())
            .await
            .unwrap();
        f.call_signaling
            .accept(&user("bob"), &user("alice"), Map::new())
            .await
            .unwrap();
        bob_rx.recv().await.unwrap();

        drop(alice_rx);
        let delivered = f
            .registry
            .send_to(&user("alice"), &OutboundFrame::online_status(user("bob"), true))
            .await;
        assert!(!delivered);
        assert!(!f.registry.is_online(&user("alice")).await);

        // when (操作):
        let outcome = f.usecase.execute(&user("alice"), alice.connection_id).await;

        // then (期待する結果):
        assert!(outcome.unregistered);
        assert_eq!(outcome.left_rooms, vec![room("r1")]);
        assert_eq!(outcome.ended_calls, 1);
        assert_eq!(f.calls.count().await, 0);
        assert_eq!(
            f.rooms.members_of(&room("r1")).await.into_iter().collect::<Vec<_>>(),
            vec![user("bob")]
        );

        let end: Value = serde_json::from_str(&bob_rx.recv().await.unwrap()).unwrap();
        assert_eq!(end["type"], "video_call_end");
        assert_eq!(end["data"]["reason"], "peer_disconnected");
        let presence: Value = serde_json::from_str(&bob_rx.recv().await.unwrap()).unwrap();
        assert_eq!(presence["type"], "online_status");
        assert_eq!(presence["user_id"], "alice");
        assert_eq!(presence["is_online"], false);

        // 同じ 2 人で再び通話できる
        assert!(
            f.call_signaling
                .invite(&user("bob"), &user("alice"), Map::new())
                .await
                .is_ok()
        );
    }
}
