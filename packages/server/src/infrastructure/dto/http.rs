//! HTTP API request / response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::NotificationKind;

use super::websocket::NotificationDto;

/// Response for `GET /api/online`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineUsersDto {
    pub users: Vec<String>,
    pub count: usize,
}

/// Response for `GET /api/online/{user_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceDto {
    pub user_id: String,
    pub online: bool,
}

/// Response for `GET /api/rooms/{chat_id}/members`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMembersDto {
    pub chat_id: String,
    pub members: Vec<String>,
}

/// Request body for `POST /api/chats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateChatRequest {
    pub chat_id: String,
    pub members: Vec<String>,
}

/// Request body for `POST /api/notifications`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNotificationRequest {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub extra_data: Option<serde_json::Value>,
}

/// Response for `POST /api/notifications`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationCreatedDto {
    pub id: String,
    pub delivered: bool,
    pub notification: NotificationDto,
}

/// Error body shared by the HTTP handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDto {
    pub error: String,
}
