//! Conversion logic between DTOs and domain types.

use gymates_hub_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    FrameKind, Notification, NotificationDraft, OutboundFrame, SignalKind, Timestamp, UserId,
    ValueObjectError,
};
use crate::infrastructure::dto::{http, websocket as dto};

// ========================================
// Domain → DTO
// ========================================

impl From<&Notification> for dto::NotificationDto {
    fn from(model: &Notification) -> Self {
        Self {
            id: model.id.as_str().to_string(),
            user_id: model.user_id.as_str().to_string(),
            kind: model.kind.as_str().to_string(),
            title: model.title.clone(),
            content: model.content.clone(),
            image_url: model.image_url.clone(),
            action_url: model.action_url.clone(),
            is_read: model.is_read,
            extra_data: model.extra_data.clone(),
            created_at: timestamp_to_rfc3339(model.created_at.value()),
        }
    }
}

impl dto::ServerFrame {
    /// Encode a domain frame, stamping it with the send-time timestamp.
    pub fn from_outbound(frame: &OutboundFrame, sent_at: Timestamp) -> Self {
        let user_id = frame.from.as_str().to_string();
        let timestamp = sent_at.value();

        match &frame.kind {
            FrameKind::ChatMessage {
                chat_id,
                message_id,
                content,
            } => dto::ServerFrame::Message(dto::ChatMessageFrame {
                chat_id: chat_id.as_str().to_string(),
                user_id,
                message_id: message_id.as_str().to_string(),
                content: content.clone(),
                timestamp,
            }),
            FrameKind::TypingStatus { chat_id, is_typing } => dto::ServerFrame::TypingStatus {
                chat_id: chat_id.as_str().to_string(),
                user_id,
                is_typing: *is_typing,
                timestamp,
            },
            FrameKind::OnlineStatus { is_online } => dto::ServerFrame::OnlineStatus {
                user_id,
                is_online: *is_online,
                timestamp,
            },
            FrameKind::Notification(notification) => dto::ServerFrame::Notification {
                user_id,
                data: dto::NotificationData {
                    notification: notification.as_ref().into(),
                },
                timestamp,
            },
            FrameKind::Signal { kind, data } => {
                let body = dto::SignalFrame {
                    user_id,
                    data: data.clone(),
                    timestamp,
                };
                match kind {
                    SignalKind::Invite => dto::ServerFrame::VideoCallInvite(body),
                    SignalKind::Accept => dto::ServerFrame::VideoCallAccept(body),
                    SignalKind::Reject => dto::ServerFrame::VideoCallReject(body),
                    SignalKind::End => dto::ServerFrame::VideoCallEnd(body),
                    SignalKind::IceCandidate => dto::ServerFrame::IceCandidate(body),
                    SignalKind::SdpOffer => dto::ServerFrame::SdpOffer(body),
                    SignalKind::SdpAnswer => dto::ServerFrame::SdpAnswer(body),
                }
            }
        }
    }
}

// ========================================
// DTO → Domain
// ========================================

impl TryFrom<http::CreateNotificationRequest> for NotificationDraft {
    type Error = ValueObjectError;

    fn try_from(request: http::CreateNotificationRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::new(request.user_id)?,
            kind: request.kind,
            title: request.title,
            content: request.content,
            image_url: request.image_url,
            action_url: request.action_url,
            extra_data: request.extra_data,
        })
    }
}
