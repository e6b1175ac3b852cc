//! HTTP and WebSocket handlers.

pub mod http;
pub mod websocket;

pub use http::{
    create_chat, create_notification, get_online_users, get_room_members, get_user_presence,
    health_check,
};
pub use websocket::websocket_handler;
