//! 送信フレーム（ドメイン表現）
//!
//! ワイヤ形式（JSON）への変換は Infrastructure 層の DTO が担当します。
//! タイムスタンプは送信時に接続レジストリが付与するため、ここでは持ちません。

use std::fmt;

use super::{
    entity::Notification,
    value_object::{MessageId, RoomId, UserId},
};

/// シグナリングの不透明なペイロード（SDP・ICE 候補など）
///
/// ハブは中身を解釈せずにそのまま中継する。
pub type SignalPayload = serde_json::Map<String, serde_json::Value>;

/// フレームの宛先スコープ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameScope {
    User(UserId),
    Room(RoomId),
    Broadcast,
}

impl fmt::Display for FrameScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameScope::User(user_id) => write!(f, "user '{}'", user_id),
            FrameScope::Room(room_id) => write!(f, "room '{}'", room_id),
            FrameScope::Broadcast => write!(f, "everyone"),
        }
    }
}

/// 通話シグナリングの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Invite,
    Accept,
    Reject,
    End,
    IceCandidate,
    SdpOffer,
    SdpAnswer,
}

/// 通話終了の理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEndReason {
    Hangup,
    PeerDisconnected,
    Timeout,
}

impl CallEndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallEndReason::Hangup => "hangup",
            CallEndReason::PeerDisconnected => "peer_disconnected",
            CallEndReason::Timeout => "timeout",
        }
    }
}

/// フレームの種類と種類ごとのペイロード
#[derive(Debug, Clone, PartialEq)]
pub enum FrameKind {
    ChatMessage {
        chat_id: RoomId,
        message_id: MessageId,
        content: String,
    },
    TypingStatus {
        chat_id: RoomId,
        is_typing: bool,
    },
    OnlineStatus {
        is_online: bool,
    },
    Notification(Box<Notification>),
    Signal {
        kind: SignalKind,
        data: SignalPayload,
    },
}

impl FrameKind {
    pub fn name(&self) -> &'static str {
        match self {
            FrameKind::ChatMessage { .. } => "message",
            FrameKind::TypingStatus { .. } => "typing_status",
            FrameKind::OnlineStatus { .. } => "online_status",
            FrameKind::Notification(_) => "notification",
            FrameKind::Signal { kind, .. } => match kind {
                SignalKind::Invite => "video_call_invite",
                SignalKind::Accept => "video_call_accept",
                SignalKind::Reject => "video_call_reject",
                SignalKind::End => "video_call_end",
                SignalKind::IceCandidate => "ice_candidate",
                SignalKind::SdpOffer => "sdp_offer",
                SignalKind::SdpAnswer => "sdp_answer",
            },
        }
    }
}

/// 接続へ送るフレーム 1 件
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundFrame {
    /// 送信元ユーザー（クライアント由来のフレームでは接続に紐づくユーザー）
    pub from: UserId,
    pub scope: FrameScope,
    pub kind: FrameKind,
}

impl OutboundFrame {
    pub fn chat_message(
        from: UserId,
        chat_id: RoomId,
        message_id: MessageId,
        content: String,
    ) -> Self {
        Self {
            from,
            scope: FrameScope::Room(chat_id.clone()),
            kind: FrameKind::ChatMessage {
                chat_id,
                message_id,
                content,
            },
        }
    }

    pub fn typing_status(from: UserId, chat_id: RoomId, is_typing: bool) -> Self {
        Self {
            from,
            scope: FrameScope::Room(chat_id.clone()),
            kind: FrameKind::TypingStatus { chat_id, is_typing },
        }
    }

    pub fn online_status(user_id: UserId, is_online: bool) -> Self {
        Self {
            from: user_id,
            scope: FrameScope::Broadcast,
            kind: FrameKind::OnlineStatus { is_online },
        }
    }

    /// 通知は宛先ユーザーを送信元として扱う
    pub fn notification(notification: Notification) -> Self {
        Self {
            from: notification.user_id.clone(),
            scope: FrameScope::User(notification.user_id.clone()),
            kind: FrameKind::Notification(Box::new(notification)),
        }
    }

    pub fn signal(from: UserId, to: UserId, kind: SignalKind, data: SignalPayload) -> Self {
        Self {
            from,
            scope: FrameScope::User(to),
            kind: FrameKind::Signal { kind, data },
        }
    }
}

impl fmt::Display for OutboundFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from '{}' to {}",
            self.kind.name(),
            self.from,
            self.scope
        )
    }
}
