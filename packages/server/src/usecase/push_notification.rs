//! UseCase: 通知のプッシュ
//!
//! 永続化済みの通知を宛先ユーザーへライブで届ける。宛先がオフラインでも
//! 永続化されたコピーが残るため、次回の取得時に表示される。

use std::sync::Arc;

use crate::domain::{
    ConnectionRegistry, Notification, NotificationDraft, NotificationStore, OutboundFrame,
};

use super::error::CreateNotificationError;

/// 作成・プッシュの結果
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedNotification {
    pub notification: Notification,
    pub delivered: bool,
}

/// 通知プッシュのユースケース
pub struct PushNotificationUseCase {
    store: Arc<dyn NotificationStore>,
    registry: Arc<dyn ConnectionRegistry>,
}

impl PushNotificationUseCase {
    pub fn new(store: Arc<dyn NotificationStore>, registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { store, registry }
    }

    /// 永続化済みの通知を届ける。ライブで届いた場合 `true`。
    pub async fn push(&self, notification: &Notification) -> bool {
        let user_id = notification.user_id.clone();
        let delivered = self
            .registry
            .send_to(&user_id, &OutboundFrame::notification(notification.clone()))
            .await;
        tracing::info!(
            "Notification {} for '{}' ({}) delivered live: {}",
            notification.id.as_str(),
            user_id,
            notification.kind.as_str(),
            delivered
        );
        delivered
    }

    /// 通知を永続化してから届ける
    pub async fn create_and_push(
        &self,
        draft: NotificationDraft,
    ) -> Result<CreatedNotification, CreateNotificationError> {
        let notification = self.store.persist_notification(draft).await?;
        let delivered = self.push(&notification).await;
        Ok(CreatedNotification {
            notification,
            delivered,
        })
    }
}
