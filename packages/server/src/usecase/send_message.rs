//! UseCase: チャットメッセージ送信
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 永続化が先に行われ、払い出された message_id がライブ配信に載ることを確認
//! - 永続化に失敗した場合は何も配信されないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：送信者以外の購読者へ配信
//! - 異常系：空のメッセージ、永続化の拒否

use std::sync::Arc;

use crate::domain::{ChatStore, MessageId, OutboundFrame, RoomId, UserId};

use super::{error::SendMessageError, room_broadcast::RoomBroadcaster};

/// 送信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: MessageId,
    /// ライブで届いた購読者数
    pub delivered: usize,
}

/// チャットメッセージ送信のユースケース
pub struct SendMessageUseCase {
    chat_store: Arc<dyn ChatStore>,
    broadcaster: Arc<RoomBroadcaster>,
}

impl SendMessageUseCase {
    pub fn new(chat_store: Arc<dyn ChatStore>, broadcaster: Arc<RoomBroadcaster>) -> Self {
        Self {
            chat_store,
            broadcaster,
        }
    }

    /// メッセージを永続化し、送信者以外の購読者へ配信する
    ///
    /// # Arguments
    ///
    /// * `sender` - 接続に紐づくユーザー ID
    /// * `room_id` - 送信先のチャット
    /// * `content` - 本文
    pub async fn execute(
        &self,
        sender: &UserId,
        room_id: &RoomId,
        content: String,
    ) -> Result<SentMessage, SendMessageError> {
        if content.trim().is_empty() {
            return Err(SendMessageError::EmptyContent);
        }

        // 1. 永続化
        let message_id = self
            .chat_store
            .persist_message(room_id, sender, &content)
            .await?;

        // 2. ライブ配信（送信者は除く）
        let frame =
            OutboundFrame::chat_message(sender.clone(), room_id.clone(), message_id.clone(), content);
        let delivered = self
            .broadcaster
            .broadcast_to_room(room_id, &frame, Some(sender))
            .await;

        Ok(SentMessage {
            message_id,
            delivered,
        })
    }
}
