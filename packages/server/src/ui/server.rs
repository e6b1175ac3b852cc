//! Server execution logic.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        create_chat, create_notification, get_online_users, get_room_members, get_user_presence,
        health_check, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket hub server
///
/// # Example
///
/// ```ignore
/// let state = AppState::in_memory(authenticator, Arc::new(SystemClock));
/// let server = Server::new(state, None);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    /// 未応答の招待を期限切れにするまでの時間（`None` なら期限なし）
    call_invite_timeout: Option<Duration>,
}

impl Server {
    pub fn new(state: AppState, call_invite_timeout: Option<Duration>) -> Self {
        Self {
            state: Arc::new(state),
            call_invite_timeout,
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the axum router
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/online", get(get_online_users))
            .route("/api/online/{user_id}", get(get_user_presence))
            .route("/api/rooms/{chat_id}/members", get(get_room_members))
            .route("/api/chats", post(create_chat))
            .route("/api/notifications", post(create_notification))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the invite sweeper when an invite timeout is configured
    pub fn spawn_invite_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
        let timeout = self.call_invite_timeout?;
        let max_age_secs = timeout.as_secs().max(1);
        let period = Duration::from_secs(max_age_secs.clamp(1, 5));
        let state = self.state.clone();

        tracing::info!("Call invites expire after {}s", max_age_secs);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let expired = state
                    .call_signaling_usecase
                    .expire_stale_invites(max_age_secs)
                    .await;
                if expired > 0 {
                    tracing::info!("Expired {} stale call invites", expired);
                }
            }
        }))
    }

    /// Serve on an already-bound listener until the shutdown signal
    pub async fn serve(self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();
        let sweeper = self.spawn_invite_sweeper();

        tracing::info!("Gymates hub listening on {}", listener.local_addr()?);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        result?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Run the hub
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Connect to: ws://{}/ws?user_id=<id>", bind_addr);
        self.serve(listener).await
    }
}
