//! WebSocket connection handlers.

use std::{fmt::Display, sync::Arc};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::{Sink, SinkExt},
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};

use crate::{
    domain::{Credentials, UserId},
    infrastructure::dto::websocket::ServerFrame,
    ui::{
        dispatcher::{DispatchOutcome, FrameDispatcher},
        state::AppState,
    },
};

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

impl From<ConnectQuery> for Credentials {
    fn from(query: ConnectQuery) -> Self {
        Credentials {
            user_id: query.user_id,
            token: query.token,
        }
    }
}

/// Serializes writes to one connection's socket.
///
/// The pusher loop and direct replies from the read loop both write through
/// the same writer, so at most one frame is being written at a time.
pub struct FrameWriter<S> {
    sink: Mutex<S>,
}

impl<S> FrameWriter<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    pub fn new(sink: S) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Write one already-encoded text frame.
    pub async fn send_text(&self, text: String) -> Result<(), S::Error> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.into())).await
    }

    pub async fn send_frame(&self, frame: &ServerFrame) -> Result<(), S::Error> {
        match serde_json::to_string(frame) {
            Ok(json) => self.send_text(json).await,
            Err(e) => {
                tracing::error!("Failed to encode frame: {}", e);
                Ok(())
            }
        }
    }

    /// Send a close frame. Errors are ignored; the peer may already be gone.
    pub async fn close(&self) {
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(Message::Close(None)).await {
            tracing::debug!("Close frame not sent: {}", e);
        }
    }

    pub fn into_inner(self) -> S {
        self.sink.into_inner()
    }
}

type SocketWriter = FrameWriter<SplitSink<WebSocket, Message>>;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let credentials = Credentials::from(query);
    let user_id = match state.connect_user_usecase.authenticate(&credentials) {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!("Rejecting WebSocket upgrade: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Spawns a task that drains the connection's outbox into the socket.
///
/// The loop ends when the outbox is dropped by the registry (the user was
/// replaced or torn down) or when a write fails. A replaced connection is
/// closed once its outbox is drained.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    writer: Arc<SocketWriter>,
    user_id: UserId,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(json) = rx.recv().await {
            if let Err(e) = writer.send_text(json).await {
                tracing::error!("Failed to push frame to '{}': {}", user_id, e);
                return;
            }
        }
        writer.close().await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let (sender, mut receiver) = socket.split();
    let writer = Arc::new(FrameWriter::new(sender));

    // 登録。書き込みタスクを起動するまで、他からのフレームは outbox に溜まる。
    let (tx, rx) = mpsc::unbounded_channel();
    let connected = state
        .connect_user_usecase
        .execute(user_id.clone(), tx)
        .await;
    let connection_id = connected.registration.connection_id;

    // 接続直後の挨拶は必ず最初のフレームになる
    let greeting = ServerFrame::Connected {
        user_id: user_id.to_string(),
        online_users: connected
            .online_users
            .into_iter()
            .map(UserId::into_string)
            .collect(),
        timestamp: state.clock.now_unix_secs(),
    };
    if let Err(e) = writer.send_frame(&greeting).await {
        tracing::error!("Failed to greet '{}': {}", user_id, e);
    }

    let mut send_task = pusher_loop(rx, writer.clone(), user_id.clone());

    let dispatcher = FrameDispatcher::new(state.clone());
    let reader_user_id = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error from '{}': {}", reader_user_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    match dispatcher.dispatch_text(&reader_user_id, text.as_str()).await {
                        DispatchOutcome::Handled | DispatchOutcome::Dropped => {}
                        DispatchOutcome::Reply(frame) => {
                            if let Err(e) = writer.send_frame(&frame).await {
                                tracing::error!(
                                    "Failed to reply to '{}': {}",
                                    reader_user_id,
                                    e
                                );
                                break;
                            }
                        }
                        DispatchOutcome::Close => {
                            writer.close().await;
                            break;
                        }
                    }
                }
                Message::Binary(_) => {
                    tracing::debug!("Ignoring binary frame from '{}'", reader_user_id);
                }
                Message::Close(_) => {
                    tracing::info!("'{}' requested close", reader_user_id);
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state
        .disconnect_user_usecase
        .execute(&user_id, connection_id)
        .await;
}
