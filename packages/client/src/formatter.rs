//! Message formatting utilities for client display.

use chrono::{DateTime, Utc};
use gymates_hub_server::infrastructure::dto::{
    http::OnlineUsersDto,
    websocket::{ChatMessageFrame, ServerFrame, SignalFrame},
};
use gymates_hub_shared::time::timestamp_to_rfc3339;
use serde_json::{Map, Value};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Render one hub frame for the terminal.
    ///
    /// `current_user_id` is used to mark the local user as "(me)".
    pub fn format_frame(frame: &ServerFrame, current_user_id: &str) -> String {
        match frame {
            ServerFrame::Connected {
                user_id,
                online_users,
                timestamp,
            } => Self::format_connected(user_id, online_users, *timestamp),
            ServerFrame::Message(message) => Self::format_chat_message(message, current_user_id),
            ServerFrame::TypingStatus {
                chat_id,
                user_id,
                is_typing,
                ..
            } => {
                let state = if *is_typing {
                    "is typing..."
                } else {
                    "stopped typing"
                };
                format!("\n[{}] {} {}\n", chat_id, user_id, state)
            }
            ServerFrame::OnlineStatus {
                user_id,
                is_online,
                timestamp,
            } => {
                let marker = if *is_online { '+' } else { '-' };
                let state = if *is_online { "online" } else { "offline" };
                format!(
                    "\n{} {} is {} ({})\n",
                    marker,
                    user_id,
                    state,
                    short_time(*timestamp)
                )
            }
            ServerFrame::Notification { data, .. } => {
                let notification = &data.notification;
                format!(
                    "\n* [{}] {}: {}\n",
                    notification.kind, notification.title, notification.content
                )
            }
            ServerFrame::VideoCallInvite(signal) => {
                format!("\n~ {} is calling you{}\n", signal.user_id, detail(&signal.data))
            }
            ServerFrame::VideoCallAccept(signal) => {
                format!("\n~ {} accepted your call\n", signal.user_id)
            }
            ServerFrame::VideoCallReject(signal) => {
                format!("\n~ {} rejected your call\n", signal.user_id)
            }
            ServerFrame::VideoCallEnd(signal) => Self::format_call_end(signal),
            ServerFrame::IceCandidate(signal) => {
                format!("\n~ ICE candidate from {}\n", signal.user_id)
            }
            ServerFrame::SdpOffer(signal) => format!("\n~ SDP offer from {}\n", signal.user_id),
            ServerFrame::SdpAnswer(signal) => format!("\n~ SDP answer from {}\n", signal.user_id),
            ServerFrame::Pong { time } => format!("\npong ({})\n", time),
            ServerFrame::Error { code, message, .. } => {
                format!("\n! error [{}]: {}\n", code, message)
            }
        }
    }

    /// Format the greeting that lists who is online
    pub fn format_connected(user_id: &str, online_users: &[String], connected_at: i64) -> String {
        let mut output = String::new();
        output.push_str("\n\n============================================================\n");
        output.push_str(&format!(
            "Connected as {} at {}\n",
            user_id,
            timestamp_to_rfc3339(connected_at)
        ));
        output.push_str("Online:\n");

        if online_users.is_empty() {
            output.push_str("(Nobody else is online)\n");
        } else {
            for online in online_users {
                let me_suffix = if online == user_id { " (me)" } else { "" };
                output.push_str(&format!("{}{}\n", online, me_suffix));
            }
        }

        output.push_str("============================================================\n");
        output
    }

    pub fn format_chat_message(message: &ChatMessageFrame, current_user_id: &str) -> String {
        let me_suffix = if message.user_id == current_user_id {
            " (me)"
        } else {
            ""
        };
        format!(
            "\n[{}] {} {}{}: {}\n",
            message.chat_id,
            short_time(message.timestamp),
            message.user_id,
            me_suffix,
            message.content
        )
    }

    pub fn format_online_users(online: &OnlineUsersDto) -> String {
        format!("\n{} online: {}\n", online.count, online.users.join(", "))
    }

    fn format_call_end(signal: &SignalFrame) -> String {
        match signal.data.get("reason").and_then(Value::as_str) {
            Some(reason) => format!("\n~ call with {} ended ({})\n", signal.user_id, reason),
            None => format!("\n~ call with {} ended\n", signal.user_id),
        }
    }
}

/// `HH:MM:SS` in UTC
fn short_time(timestamp_secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp_secs, 0)
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_secs.to_string())
}

fn detail(data: &Map<String, Value>) -> String {
    match data.get("call_type").and_then(Value::as_str) {
        Some(call_type) => format!(" ({})", call_type),
        None => String::new(),
    }
}
