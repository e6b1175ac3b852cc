//! Frame dispatcher.
//!
//! Routes each decoded inbound frame to exactly one use case. The
//! originating user is always the one bound to the connection; any
//! `user_id` the client put into the frame never reaches this point.

use std::sync::Arc;

use crate::{
    domain::{CallError, RoomId, SignalPayload, StoreError, UserId},
    infrastructure::dto::websocket::{
        ClientFrame, FrameDecodeError, ServerFrame, decode_client_frame,
    },
    usecase::{
        RelayTypingError, RoomSubscriptionError, SendMessageError, call_signaling::SdpKind,
    },
};

use super::state::AppState;

/// What the connection should do after a frame was dispatched.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The frame was handled; nothing goes back to the sender.
    Handled,
    /// Send this frame back to the sender only.
    Reply(ServerFrame),
    /// The frame was dropped without a reply.
    Dropped,
    /// Transport-level failure; tear the connection down.
    Close,
}

/// Error codes carried by `error` frames.
pub mod error_code {
    pub const MISSING_TYPE: &str = "missing_type";
    pub const INVALID_PAYLOAD: &str = "invalid_payload";
    pub const CHAT_NOT_FOUND: &str = "chat_not_found";
    pub const NOT_A_MEMBER: &str = "not_a_member";
    pub const STORE_UNAVAILABLE: &str = "store_unavailable";
    pub const SELF_CALL: &str = "self_call";
    pub const CALL_EXISTS: &str = "call_exists";
    pub const CALL_NOT_FOUND: &str = "call_not_found";
    pub const INVALID_CALL_STATE: &str = "invalid_call_state";
    pub const NOT_CALLEE: &str = "not_callee";
}

pub struct FrameDispatcher {
    state: Arc<AppState>,
}

impl FrameDispatcher {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Decode one inbound text frame and route it.
    pub async fn dispatch_text(&self, user_id: &UserId, text: &str) -> DispatchOutcome {
        match decode_client_frame(text) {
            Ok(frame) => self.dispatch(user_id, frame).await,
            Err(FrameDecodeError::Malformed(e)) => {
                tracing::error!("Malformed frame from '{}': {}", user_id, e);
                DispatchOutcome::Close
            }
            Err(FrameDecodeError::MissingKind) => {
                tracing::warn!("Frame without type from '{}'", user_id);
                self.error(error_code::MISSING_TYPE, "frame has no `type` field")
            }
            Err(FrameDecodeError::UnknownKind(kind)) => {
                tracing::warn!("Unknown frame kind '{}' from '{}', dropped", kind, user_id);
                DispatchOutcome::Dropped
            }
            Err(e @ FrameDecodeError::InvalidPayload { .. }) => {
                tracing::warn!("Invalid frame from '{}': {}", user_id, e);
                self.error(error_code::INVALID_PAYLOAD, &e.to_string())
            }
        }
    }

    /// Route one decoded frame.
    pub async fn dispatch(&self, user_id: &UserId, frame: ClientFrame) -> DispatchOutcome {
        tracing::debug!("Dispatching {:?} from '{}'", frame, user_id);
        match frame {
            ClientFrame::Ping { time } => DispatchOutcome::Reply(ServerFrame::Pong { time }),
            ClientFrame::JoinChat { chat_id } => self.join_chat(user_id, chat_id).await,
            ClientFrame::LeaveChat { chat_id } => {
                let Some(room_id) = parse_room(&chat_id) else {
                    return self.invalid_identifier("chat_id");
                };
                self.state
                    .room_subscription_usecase
                    .leave(&room_id, user_id)
                    .await;
                DispatchOutcome::Handled
            }
            ClientFrame::Typing { chat_id, is_typing } => {
                self.typing(user_id, chat_id, is_typing).await
            }
            ClientFrame::StopTyping { chat_id } => self.typing(user_id, chat_id, false).await,
            ClientFrame::Message { chat_id, content } => {
                self.send_message(user_id, chat_id, content).await
            }
            ClientFrame::VideoCallInvite { data } => {
                let Some(callee) = parse_user(&data.callee_id) else {
                    return self.invalid_identifier("callee_id");
                };
                let result = self
                    .state
                    .call_signaling_usecase
                    .invite(user_id, &callee, data.payload)
                    .await;
                self.call_result(result)
            }
            ClientFrame::VideoCallAccept { data } => {
                let Some(caller) = parse_user(&data.caller_id) else {
                    return self.invalid_identifier("caller_id");
                };
                let result = self
                    .state
                    .call_signaling_usecase
                    .accept(user_id, &caller, data.payload)
                    .await;
                self.call_result(result)
            }
            ClientFrame::VideoCallReject { data } => {
                let Some(caller) = parse_user(&data.caller_id) else {
                    return self.invalid_identifier("caller_id");
                };
                let result = self
                    .state
                    .call_signaling_usecase
                    .reject(user_id, &caller, data.payload)
                    .await;
                self.call_result(result)
            }
            ClientFrame::VideoCallEnd { data } => {
                let Some(other) = parse_user(&data.other_user_id) else {
                    return self.invalid_identifier("other_user_id");
                };
                let result = self
                    .state
                    .call_signaling_usecase
                    .end(user_id, &other, data.payload)
                    .await;
                self.call_result(result)
            }
            ClientFrame::IceCandidate { data } => {
                let Some(other) = parse_user(&data.other_user_id) else {
                    return self.invalid_identifier("other_user_id");
                };
                let result = self
                    .state
                    .call_signaling_usecase
                    .relay_ice(user_id, &other, data.payload)
                    .await;
                self.call_result(result)
            }
            ClientFrame::SdpOffer { data } => {
                self.relay_sdp(user_id, SdpKind::Offer, &data.other_user_id, data.payload)
                    .await
            }
            ClientFrame::SdpAnswer { data } => {
                self.relay_sdp(user_id, SdpKind::Answer, &data.other_user_id, data.payload)
                    .await
            }
        }
    }

    async fn join_chat(&self, user_id: &UserId, chat_id: String) -> DispatchOutcome {
        let Some(room_id) = parse_room(&chat_id) else {
            return self.invalid_identifier("chat_id");
        };
        match self
            .state
            .room_subscription_usecase
            .join(room_id, user_id.clone())
            .await
        {
            Ok(_) => DispatchOutcome::Handled,
            Err(e) => {
                tracing::warn!("Join refused for '{}': {}", user_id, e);
                let code = match e {
                    RoomSubscriptionError::ChatNotFound(_) => error_code::CHAT_NOT_FOUND,
                    RoomSubscriptionError::NotAMember { .. } => error_code::NOT_A_MEMBER,
                    RoomSubscriptionError::Store(_) => error_code::STORE_UNAVAILABLE,
                };
                self.error(code, &e.to_string())
            }
        }
    }

    async fn typing(&self, user_id: &UserId, chat_id: String, is_typing: bool) -> DispatchOutcome {
        let Some(room_id) = parse_room(&chat_id) else {
            return self.invalid_identifier("chat_id");
        };
        match self
            .state
            .relay_typing_usecase
            .execute(user_id, &room_id, is_typing)
            .await
        {
            Ok(_) => DispatchOutcome::Handled,
            Err(e @ RelayTypingError::NotSubscribed { .. }) => {
                self.error(error_code::NOT_A_MEMBER, &e.to_string())
            }
        }
    }

    async fn send_message(
        &self,
        user_id: &UserId,
        chat_id: String,
        content: String,
    ) -> DispatchOutcome {
        let Some(room_id) = parse_room(&chat_id) else {
            return self.invalid_identifier("chat_id");
        };
        match self
            .state
            .send_message_usecase
            .execute(user_id, &room_id, content)
            .await
        {
            Ok(sent) => {
                tracing::debug!(
                    "Message {} from '{}' fanned out to {} members of '{}'",
                    sent.message_id.as_str(),
                    user_id,
                    sent.delivered,
                    room_id
                );
                DispatchOutcome::Handled
            }
            Err(e) => {
                tracing::warn!("Message from '{}' refused: {}", user_id, e);
                let code = match &e {
                    SendMessageError::EmptyContent => error_code::INVALID_PAYLOAD,
                    SendMessageError::Persist(store_error) => store_error_code(store_error),
                };
                self.error(code, &e.to_string())
            }
        }
    }

    async fn relay_sdp(
        &self,
        user_id: &UserId,
        kind: SdpKind,
        other_user_id: &str,
        payload: SignalPayload,
    ) -> DispatchOutcome {
        let Some(other) = parse_user(other_user_id) else {
            return self.invalid_identifier("other_user_id");
        };
        let result = self
            .state
            .call_signaling_usecase
            .relay_sdp(kind, user_id, &other, payload)
            .await;
        self.call_result(result)
    }

    fn call_result(&self, result: Result<bool, CallError>) -> DispatchOutcome {
        match result {
            Ok(_) => DispatchOutcome::Handled,
            Err(e) => {
                tracing::warn!("Call signaling refused: {}", e);
                let code = match e {
                    CallError::SelfCall => error_code::SELF_CALL,
                    CallError::SessionAlreadyExists => error_code::CALL_EXISTS,
                    CallError::SessionNotFound => error_code::CALL_NOT_FOUND,
                    CallError::InvalidState { .. } | CallError::IllegalTransition { .. } => {
                        error_code::INVALID_CALL_STATE
                    }
                    CallError::NotCallee => error_code::NOT_CALLEE,
                };
                self.error(code, &e.to_string())
            }
        }
    }

    fn invalid_identifier(&self, field: &str) -> DispatchOutcome {
        self.error(error_code::INVALID_PAYLOAD, &format!("invalid `{}`", field))
    }

    fn error(&self, code: &str, message: &str) -> DispatchOutcome {
        DispatchOutcome::Reply(ServerFrame::Error {
            code: code.to_string(),
            message: message.to_string(),
            timestamp: self.state.clock.now_unix_secs(),
        })
    }
}

fn store_error_code(error: &StoreError) -> &'static str {
    match error {
        StoreError::ChatNotFound(_) => error_code::CHAT_NOT_FOUND,
        StoreError::NotAMember { .. } => error_code::NOT_A_MEMBER,
        StoreError::Unavailable(_) => error_code::STORE_UNAVAILABLE,
    }
}

fn parse_room(raw: &str) -> Option<RoomId> {
    RoomId::new(raw.to_string()).ok()
}

fn parse_user(raw: &str) -> Option<UserId> {
    UserId::new(raw.to_string()).ok()
}
