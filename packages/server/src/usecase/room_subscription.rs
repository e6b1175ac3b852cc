//! UseCase: ルームの購読・購読解除
//!
//! 購読の前に永続化されたチャットメンバーを確認し、メンバーでないユーザーは購読させない。

use std::sync::Arc;

use crate::domain::{ChatStore, RoomId, RoomMembershipRepository, UserId};

use super::error::RoomSubscriptionError;

/// ルーム購読のユースケース
pub struct RoomSubscriptionUseCase {
    rooms: Arc<dyn RoomMembershipRepository>,
    chat_store: Arc<dyn ChatStore>,
}

impl RoomSubscriptionUseCase {
    pub fn new(rooms: Arc<dyn RoomMembershipRepository>, chat_store: Arc<dyn ChatStore>) -> Self {
        Self { rooms, chat_store }
    }

    /// 購読する。新たに購読した場合 `Ok(true)`、既に購読済みなら `Ok(false)`。
    pub async fn join(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<bool, RoomSubscriptionError> {
        let members = self.chat_store.resolve_room_members(&room_id).await?;
        if !members.contains(&user_id) {
            return Err(RoomSubscriptionError::NotAMember {
                chat_id: room_id.into_string(),
                user_id: user_id.into_string(),
            });
        }

        let joined = self.rooms.join(room_id.clone(), user_id.clone()).await;
        if joined {
            tracing::info!("User '{}' joined room '{}'", user_id, room_id);
        }
        Ok(joined)
    }

    /// 購読を外す（冪等）
    pub async fn leave(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        let left = self.rooms.leave(room_id, user_id).await;
        if left {
            tracing::info!("User '{}' left room '{}'", user_id, room_id);
        }
        left
    }
}
