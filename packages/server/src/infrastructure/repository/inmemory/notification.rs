//! InMemory NotificationStore 実装

use std::sync::Arc;

use async_trait::async_trait;
use gymates_hub_shared::time::Clock;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    Notification, NotificationDraft, NotificationId, NotificationStore, StoreError, Timestamp,
    UserId,
};

/// インメモリ NotificationStore 実装
pub struct InMemoryNotificationStore {
    notifications: RwLock<Vec<Notification>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryNotificationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            notifications: RwLock::new(Vec::new()),
            clock,
        }
    }

    /// ユーザー宛ての保存済み通知（保存順）
    pub async fn notifications_for(&self, user_id: &UserId) -> Vec<Notification> {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|n| &n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn persist_notification(
        &self,
        draft: NotificationDraft,
    ) -> Result<Notification, StoreError> {
        let notification = Notification::from_draft(
            NotificationId::new(Uuid::new_v4().to_string()),
            draft,
            Timestamp::new(self.clock.now_unix_secs()),
        );
        self.notifications.write().await.push(notification.clone());
        Ok(notification)
    }
}
