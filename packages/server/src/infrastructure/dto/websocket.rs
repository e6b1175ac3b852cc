//! WebSocket frame DTOs.
//!
//! Frames are internally tagged JSON objects (`{"type": "message", ...}`).
//! Inbound frames are decoded once at the dispatcher boundary into
//! [`ClientFrame`]; outbound frames are encoded from [`ServerFrame`].
//!
//! Any `user_id` a client puts into an inbound frame is ignored: the
//! originating user is always the one bound to the connection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

fn default_true() -> bool {
    true
}

/// Call invitation payload. Keys other than `callee_id` are forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteData {
    pub callee_id: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Answer (accept / reject) payload. Keys other than `caller_id` are forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerData {
    pub caller_id: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// End / SDP / ICE payload. Keys other than `other_user_id` are forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerData {
    pub other_user_id: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Client -> Hub
// ---------------------------------------------------------------------------

/// Frames sent by connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Liveness check; answered with a `pong` echoing `time`.
    Ping {
        #[serde(default)]
        time: Value,
    },
    JoinChat {
        chat_id: String,
    },
    LeaveChat {
        chat_id: String,
    },
    Typing {
        chat_id: String,
        #[serde(default = "default_true")]
        is_typing: bool,
    },
    StopTyping {
        chat_id: String,
    },
    Message {
        chat_id: String,
        content: String,
    },
    VideoCallInvite {
        data: InviteData,
    },
    VideoCallAccept {
        data: AnswerData,
    },
    VideoCallReject {
        data: AnswerData,
    },
    VideoCallEnd {
        data: PeerData,
    },
    IceCandidate {
        data: PeerData,
    },
    SdpOffer {
        data: PeerData,
    },
    SdpAnswer {
        data: PeerData,
    },
}

impl ClientFrame {
    /// Every `type` tag the hub understands on inbound frames.
    pub const KINDS: [&'static str; 13] = [
        "ping",
        "join_chat",
        "leave_chat",
        "typing",
        "stop_typing",
        "message",
        "video_call_invite",
        "video_call_accept",
        "video_call_reject",
        "video_call_end",
        "ice_candidate",
        "sdp_offer",
        "sdp_answer",
    ];
}

/// Why an inbound text frame could not be turned into a [`ClientFrame`].
#[derive(Debug, Error)]
pub enum FrameDecodeError {
    /// Not JSON at all. Treated as a transport error.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("frame has no string `type` field")]
    MissingKind,

    #[error("unknown frame kind '{0}'")]
    UnknownKind(String),

    #[error("invalid '{kind}' frame: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode one inbound text frame.
pub fn decode_client_frame(text: &str) -> Result<ClientFrame, FrameDecodeError> {
    let value: Value = serde_json::from_str(text).map_err(FrameDecodeError::Malformed)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(FrameDecodeError::MissingKind)?
        .to_string();

    if !ClientFrame::KINDS.contains(&kind.as_str()) {
        return Err(FrameDecodeError::UnknownKind(kind));
    }

    serde_json::from_value(value).map_err(|source| FrameDecodeError::InvalidPayload { kind, source })
}

// ---------------------------------------------------------------------------
// Hub -> Client
// ---------------------------------------------------------------------------

/// A chat message fanned out to a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageFrame {
    pub chat_id: String,
    pub user_id: String,
    pub message_id: String,
    pub content: String,
    pub timestamp: i64,
}

/// A relayed call-signaling frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFrame {
    pub user_id: String,
    pub data: Map<String, Value>,
    pub timestamp: i64,
}

/// Notification record as pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDto {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub action_url: Option<String>,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub extra_data: Option<Value>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationData {
    pub notification: NotificationDto,
}

/// Frames sent by the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Greeting sent once right after the upgrade.
    Connected {
        user_id: String,
        online_users: Vec<String>,
        timestamp: i64,
    },
    Message(ChatMessageFrame),
    TypingStatus {
        chat_id: String,
        user_id: String,
        is_typing: bool,
        timestamp: i64,
    },
    OnlineStatus {
        user_id: String,
        is_online: bool,
        timestamp: i64,
    },
    Notification {
        user_id: String,
        data: NotificationData,
        timestamp: i64,
    },
    VideoCallInvite(SignalFrame),
    VideoCallAccept(SignalFrame),
    VideoCallReject(SignalFrame),
    VideoCallEnd(SignalFrame),
    IceCandidate(SignalFrame),
    SdpOffer(SignalFrame),
    SdpAnswer(SignalFrame),
    Pong {
        time: Value,
    },
    /// Protocol-misuse report for the offending connection only.
    Error {
        code: String,
        message: String,
        timestamp: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_message_frame_ignores_client_user_id() {
        // テスト項目: message フレームをデコードでき、クライアントの user_id は無視される
        // given (前提条件):
        let text = r#"{"type":"message","chat_id":"r1","content":"hi","user_id":"mallory"}"#;

        // when (操作):
        let frame = decode_client_frame(text).unwrap();

        // then (期待する結果):
        assert_eq!(
            frame,
            ClientFrame::Message {
                chat_id: "r1".to_string(),
                content: "hi".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_non_json_is_malformed() {
        // テスト項目: JSON でないテキストは Malformed になる
        // given (前提条件):
        let text = "hello there";

        // when (操作):
        let result = decode_client_frame(text);

        // then (期待する結果):
        assert!(matches!(result, Err(FrameDecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_without_type_is_missing_kind() {
        // テスト項目: type の無い JSON は MissingKind になる
        // given (前提条件):
        let text = r#"{"chat_id":"r1"}"#;

        // when (操作):
        let result = decode_client_frame(text);

        // then (期待する結果):
        assert!(matches!(result, Err(FrameDecodeError::MissingKind)));
    }

    #[test]
    fn test_decode_unknown_kind() {
        // テスト項目: 未知の type は UnknownKind になる
        // given (前提条件):
        let text = r#"{"type":"dance","chat_id":"r1"}"#;

        // when (操作):
        let result = decode_client_frame(text);

        // then (期待する結果):
        assert!(matches!(result, Err(FrameDecodeError::UnknownKind(kind)) if kind == "dance"));
    }

    #[test]
    fn test_decode_known_kind_with_missing_field_is_invalid_payload() {
        // テスト項目: 必須フィールドが欠けた既知のフレームは InvalidPayload になる
        // given (前提条件):
        let text = r#"{"type":"join_chat"}"#;

        // when (操作):
        let result = decode_client_frame(text);

        // then (期待する結果):
        assert!(
            matches!(result, Err(FrameDecodeError::InvalidPayload { kind, .. }) if kind == "join_chat")
        );
    }

    #[test]
    fn test_decode_typing_defaults_to_true() {
        // テスト項目: typing フレームの is_typing は省略時 true になる
        // given (前提条件):
        let text = r#"{"type":"typing","chat_id":"r1"}"#;

        // when (操作):
        let frame = decode_client_frame(text).unwrap();

        // then (期待する結果):
        assert_eq!(
            frame,
            ClientFrame::Typing {
                chat_id: "r1".to_string(),
                is_typing: true,
            }
        );
    }

    #[test]
    fn test_decode_ping_without_time_uses_null() {
        // テスト項目: time の無い ping は null を返す
        // given (前提条件):
        let text = r#"{"type":"ping"}"#;

        // when (操作):
        let frame = decode_client_frame(text).unwrap();

        // then (期待する結果):
        assert_eq!(frame, ClientFrame::Ping { time: Value::Null });
    }

    #[test]
    fn test_decode_invite_keeps_opaque_payload() {
        // テスト項目: 招待フレームの callee_id 以外のキーはそのまま保持される
        // given (前提条件):
        let text = r#"{"type":"video_call_invite","data":{"callee_id":"bob","media":"video"}}"#;

        // when (操作):
        let frame = decode_client_frame(text).unwrap();

        // then (期待する結果):
        match frame {
            ClientFrame::VideoCallInvite { data } => {
                assert_eq!(data.callee_id, "bob");
                assert_eq!(data.payload.get("media"), Some(&json!("video")));
                assert!(!data.payload.contains_key("callee_id"));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_server_frame_wire_shape() {
        // テスト項目: 送信フレームが type タグ付きの JSON になる
        // given (前提条件):
        let frame = ServerFrame::OnlineStatus {
            user_id: "alice".to_string(),
            is_online: true,
            timestamp: 42,
        };

        // when (操作):
        let value = serde_json::to_value(&frame).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({"type":"online_status","user_id":"alice","is_online":true,"timestamp":42})
        );
    }

    #[test]
    fn test_signal_frame_wire_shape() {
        // テスト項目: シグナリングフレームは user_id と data を持つ
        // given (前提条件):
        let mut data = Map::new();
        data.insert("sdp".to_string(), json!("v=0"));
        let frame = ServerFrame::SdpOffer(SignalFrame {
            user_id: "alice".to_string(),
            data,
            timestamp: 7,
        });

        // when (操作):
        let value = serde_json::to_value(&frame).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({"type":"sdp_offer","user_id":"alice","data":{"sdp":"v=0"},"timestamp":7})
        );
    }
}
