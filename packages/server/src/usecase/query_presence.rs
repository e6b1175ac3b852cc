//! UseCase: プレゼンス・購読状況の参照（HTTP 用）

use std::{collections::BTreeSet, sync::Arc};

use crate::domain::{ConnectionRegistry, RoomId, RoomMembershipRepository, UserId};

pub struct QueryPresenceUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    rooms: Arc<dyn RoomMembershipRepository>,
}

impl QueryPresenceUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        rooms: Arc<dyn RoomMembershipRepository>,
    ) -> Self {
        Self { registry, rooms }
    }

    pub async fn online_users(&self) -> BTreeSet<UserId> {
        self.registry.list_online().await
    }

    pub async fn is_online(&self, user_id: &UserId) -> bool {
        self.registry.is_online(user_id).await
    }

    pub async fn room_members(&self, room_id: &RoomId) -> BTreeSet<UserId> {
        self.rooms.members_of(room_id).await
    }
}
