//! InMemory RoomMembership Repository 実装
//!
//! `chatID -> 購読中のユーザー集合` を HashMap で保持します。
//! ルームは最初の join で作られ、最後の leave で取り除かれます。
//! 購読表は永続化されず、プロセス再起動で空から作り直されます。

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{RoomId, RoomMembershipRepository, UserId};

/// インメモリ RoomMembership Repository 実装
#[derive(Default)]
pub struct InMemoryRoomMembershipRepository {
    rooms: RwLock<HashMap<RoomId, BTreeSet<UserId>>>,
}

impl InMemoryRoomMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomMembershipRepository for InMemoryRoomMembershipRepository {
    async fn join(&self, room_id: RoomId, user_id: UserId) -> bool {
        let mut rooms = self.rooms.write().await;
        rooms.entry(room_id).or_default().insert(user_id)
    }

    async fn leave(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(room_id) else {
            return false;
        };
        let removed = members.remove(user_id);
        if members.is_empty() {
            rooms.remove(room_id);
        }
        removed
    }

    async fn leave_all(&self, user_id: &UserId) -> Vec<RoomId> {
        let mut rooms = self.rooms.write().await;
        let mut left = Vec::new();
        rooms.retain(|room_id, members| {
            if members.remove(user_id) {
                left.push(room_id.clone());
            }
            !members.is_empty()
        });
        left.sort();
        left
    }

    async fn members_of(&self, room_id: &RoomId) -> BTreeSet<UserId> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).cloned().unwrap_or_default()
    }
}
