//! InMemory ChatStore 実装
//!
//! チャットの作成・メッセージ保存を担う外部サービスの代役です。
//! メンバーシップは `POST /api/chats` で登録されます。

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ChatStore, MessageId, RoomId, StoreError, UserId};

/// 保存済みメッセージ 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub content: String,
}

#[derive(Default)]
struct ChatRecord {
    members: BTreeSet<UserId>,
    messages: Vec<StoredMessage>,
}

/// インメモリ ChatStore 実装
#[derive(Default)]
pub struct InMemoryChatStore {
    chats: RwLock<HashMap<RoomId, ChatRecord>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// チャットを作成する。既に存在する場合はメンバーを追加する。
    pub async fn create_chat(&self, chat_id: RoomId, members: impl IntoIterator<Item = UserId>) {
        let mut chats = self.chats.write().await;
        chats.entry(chat_id).or_default().members.extend(members);
    }

    /// 保存済みメッセージ（保存順）
    pub async fn messages(&self, chat_id: &RoomId) -> Vec<StoredMessage> {
        let chats = self.chats.read().await;
        chats
            .get(chat_id)
            .map(|record| record.messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn persist_message(
        &self,
        chat_id: &RoomId,
        sender_id: &UserId,
        content: &str,
    ) -> Result<MessageId, StoreError> {
        let mut chats = self.chats.write().await;
        let record = chats
            .get_mut(chat_id)
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.to_string()))?;
        if !record.members.contains(sender_id) {
            return Err(StoreError::NotAMember {
                chat_id: chat_id.to_string(),
                user_id: sender_id.to_string(),
            });
        }

        let id = MessageId::new(Uuid::new_v4().to_string());
        record.messages.push(StoredMessage {
            id: id.clone(),
            sender_id: sender_id.clone(),
            content: content.to_string(),
        });
        Ok(id)
    }

    async fn resolve_room_members(&self, chat_id: &RoomId) -> Result<BTreeSet<UserId>, StoreError> {
        let chats = self.chats.read().await;
        chats
            .get(chat_id)
            .map(|record| record.members.clone())
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.to_string()))
    }
}
