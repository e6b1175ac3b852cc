//! UseCase: 入力中ステータスの中継
//!
//! 永続化もレート制限もせず、送信者以外のルーム購読者へそのまま転送する。
//! 送信者自身がルームを購読していなければ中継しない。

use std::sync::Arc;

use crate::domain::{OutboundFrame, RoomId, RoomMembershipRepository, UserId};

use super::{error::RelayTypingError, room_broadcast::RoomBroadcaster};

pub struct RelayTypingUseCase {
    rooms: Arc<dyn RoomMembershipRepository>,
    broadcaster: Arc<RoomBroadcaster>,
}

impl RelayTypingUseCase {
    pub fn new(rooms: Arc<dyn RoomMembershipRepository>, broadcaster: Arc<RoomBroadcaster>) -> Self {
        Self { rooms, broadcaster }
    }

    /// 届けた購読者の数を返す
    pub async fn execute(
        &self,
        sender: &UserId,
        room_id: &RoomId,
        is_typing: bool,
    ) -> Result<usize, RelayTypingError> {
        if !self.rooms.members_of(room_id).await.contains(sender) {
            tracing::warn!(
                "Typing status from '{}' dropped: not joined to '{}'",
                sender,
                room_id
            );
            return Err(RelayTypingError::NotSubscribed {
                chat_id: room_id.to_string(),
                user_id: sender.to_string(),
            });
        }

        let frame = OutboundFrame::typing_status(sender.clone(), room_id.clone(), is_typing);
        Ok(self
            .broadcaster
            .broadcast_to_room(room_id, &frame, Some(sender))
            .await)
    }
}
