//! UseCase: ルームへのブロードキャスト（BroadcastToRoom）
//!
//! ルームの購読者をスナップショットし、各購読者へ `send_to` する。
//! 接続の無い購読者は黙ってスキップする（永続化済みのデータが正）。
//! 購読者のいないルームへのブロードキャストは何もしない。

use std::sync::Arc;

use crate::domain::{ConnectionRegistry, OutboundFrame, RoomId, RoomMembershipRepository, UserId};

pub struct RoomBroadcaster {
    rooms: Arc<dyn RoomMembershipRepository>,
    registry: Arc<dyn ConnectionRegistry>,
}

impl RoomBroadcaster {
    pub fn new(
        rooms: Arc<dyn RoomMembershipRepository>,
        registry: Arc<dyn ConnectionRegistry>,
    ) -> Self {
        Self { rooms, registry }
    }

    /// ルームの購読者へ送り、届けた数を返す
    pub async fn broadcast_to_room(
        &self,
        room_id: &RoomId,
        frame: &OutboundFrame,
        exclude: Option<&UserId>,
    ) -> usize {
        let members = self.rooms.members_of(room_id).await;
        let mut delivered = 0;
        for member in members.iter().filter(|m| Some(*m) != exclude) {
            if self.registry.send_to(member, frame).await {
                delivered += 1;
            }
        }
        tracing::debug!(
            "Broadcast {} to room '{}': {}/{} delivered",
            frame,
            room_id,
            delivered,
            members.len()
        );
        delivered
    }
}
