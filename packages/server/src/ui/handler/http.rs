//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{NotificationDraft, RoomId, UserId},
    infrastructure::dto::http::{
        CreateChatRequest, CreateNotificationRequest, ErrorDto, NotificationCreatedDto,
        OnlineUsersDto, PresenceDto, RoomMembersDto,
    },
    ui::state::AppState,
    usecase::CreateNotificationError,
};

type ApiError = (StatusCode, Json<ErrorDto>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorDto {
            error: message.into(),
        }),
    )
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// List online users (sorted)
pub async fn get_online_users(State(state): State<Arc<AppState>>) -> Json<OnlineUsersDto> {
    let users: Vec<String> = state
        .query_presence_usecase
        .online_users()
        .await
        .into_iter()
        .map(UserId::into_string)
        .collect();
    Json(OnlineUsersDto {
        count: users.len(),
        users,
    })
}

/// Whether one user is online
pub async fn get_user_presence(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<PresenceDto>, ApiError> {
    let user_id = UserId::new(user_id)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let online = state.query_presence_usecase.is_online(&user_id).await;
    Ok(Json(PresenceDto {
        user_id: user_id.into_string(),
        online,
    }))
}

/// Live subscribers of a room
pub async fn get_room_members(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<Json<RoomMembersDto>, ApiError> {
    let room_id =
        RoomId::new(chat_id).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let members = state
        .query_presence_usecase
        .room_members(&room_id)
        .await
        .into_iter()
        .map(UserId::into_string)
        .collect();
    Ok(Json(RoomMembersDto {
        chat_id: room_id.into_string(),
        members,
    }))
}

/// Register durable chat membership with the in-memory chat store
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<RoomMembersDto>), ApiError> {
    let room_id = RoomId::new(request.chat_id)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let members = request
        .members
        .into_iter()
        .map(UserId::new)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    state
        .chat_directory
        .create_chat(room_id.clone(), members.iter().cloned())
        .await;
    tracing::info!("Chat '{}' registered with {} members", room_id, members.len());

    Ok((
        StatusCode::CREATED,
        Json(RoomMembersDto {
            chat_id: room_id.into_string(),
            members: members.into_iter().map(UserId::into_string).collect(),
        }),
    ))
}

/// Persist a notification and push it to the target user if online
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<NotificationCreatedDto>), ApiError> {
    let draft = NotificationDraft::try_from(request)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    match state.push_notification_usecase.create_and_push(draft).await {
        Ok(created) => Ok((
            StatusCode::CREATED,
            Json(NotificationCreatedDto {
                id: created.notification.id.as_str().to_string(),
                delivered: created.delivered,
                notification: (&created.notification).into(),
            }),
        )),
        Err(CreateNotificationError::Invalid(e)) => {
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(CreateNotificationError::Persist(e)) => {
            tracing::error!("Failed to persist notification: {}", e);
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
    }
}
