//! 通知エンティティ
//!
//! 通知の生成・保存は外部のビジネスロジックが行い、ハブは保存済みの通知を
//! オンラインの宛先に届けるだけです。

use serde::{Deserialize, Serialize};

use crate::domain::value_object::{NotificationId, Timestamp, UserId};

/// 通知の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Workout,
    Achievement,
    System,
    BuddyRequest,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
            NotificationKind::Workout => "workout",
            NotificationKind::Achievement => "achievement",
            NotificationKind::System => "system",
            NotificationKind::BuddyRequest => "buddy_request",
        }
    }
}

/// 保存前の通知（永続化コラボレータへの入力）
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub action_url: Option<String>,
    pub extra_data: Option<serde_json::Value>,
}

/// 保存済みの通知
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub action_url: Option<String>,
    pub is_read: bool,
    pub extra_data: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

impl Notification {
    /// 下書きに ID と作成時刻を付与して保存済みの通知にする
    pub fn from_draft(id: NotificationId, draft: NotificationDraft, created_at: Timestamp) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            kind: draft.kind,
            title: draft.title,
            content: draft.content,
            image_url: draft.image_url,
            action_url: draft.action_url,
            is_read: false,
            extra_data: draft.extra_data,
            created_at,
        }
    }
}
