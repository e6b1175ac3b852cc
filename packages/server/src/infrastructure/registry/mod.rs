//! 接続レジストリの実装
//!
//! - `websocket`: WebSocket 接続の送信経路（`Outbox`）を管理する実装

pub mod websocket;

pub use websocket::WebSocketConnectionRegistry;
