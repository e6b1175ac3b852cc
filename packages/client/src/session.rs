//! WebSocket client session management.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use gymates_hub_server::infrastructure::dto::{http::OnlineUsersDto, websocket::ServerFrame};
use reqwest::Url;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, protocol::Message},
};

use crate::{
    command::{Command, CommandParser},
    error::ClientError,
    formatter::MessageFormatter,
    runner::ClientConfig,
    ui::redisplay_prompt,
};

/// Terminal input shared across reconnects
pub struct Input {
    pub lines: mpsc::UnboundedReceiver<String>,
    pub parser: CommandParser,
}

/// Build the upgrade URL with the identity as query parameters
pub fn connect_url(config: &ClientConfig) -> Result<Url, ClientError> {
    let mut url = parse_url(&config.url)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("user_id", &config.user_id);
        if let Some(token) = &config.token {
            query.append_pair("token", token);
        }
    }
    Ok(url)
}

/// `ws://host:port/ws` -> `http://host:port/api/online`
pub fn online_users_url(ws_url: &str) -> Result<Url, ClientError> {
    let mut url = parse_url(ws_url)?;
    let scheme = if url.scheme() == "wss" { "https" } else { "http" };
    url.set_scheme(scheme).map_err(|_| ClientError::InvalidUrl {
        url: ws_url.to_string(),
        reason: format!("cannot switch scheme to {}", scheme),
    })?;
    url.set_path("/api/online");
    url.set_query(None);
    Ok(url)
}

fn parse_url(url: &str) -> Result<Url, ClientError> {
    Url::parse(url).map_err(|e| ClientError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

async fn fetch_online_users(url: Url) -> Result<OnlineUsersDto, ClientError> {
    let online = reqwest::get(url)
        .await?
        .error_for_status()?
        .json::<OnlineUsersDto>()
        .await?;
    Ok(online)
}

/// Run one WebSocket client session.
///
/// Returns `Ok(())` when the user quits and an error when the connection is lost.
pub async fn run_client_session(
    config: &ClientConfig,
    input: Arc<Mutex<Input>>,
) -> Result<(), ClientError> {
    let url = connect_url(config)?;
    let online_url = online_users_url(&config.url)?;

    let (ws_stream, _response) = match connect_async(url.as_str()).await {
        Ok(result) => result,
        Err(WsError::Http(response)) if response.status().as_u16() == 401 => {
            return Err(ClientError::Unauthorized(config.user_id.clone()));
        }
        Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
    };

    tracing::info!("Connected to hub!");
    println!(
        "\nYou are '{}'. /join <chat> then type to talk. /quit or Ctrl+D to exit.\n",
        config.user_id
    );

    let (mut write, mut read) = ws_stream.split();

    let user_id_for_read = config.user_id.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(frame) => {
                            print!("{}", MessageFormatter::format_frame(&frame, &user_id_for_read))
                        }
                        Err(_) => print!("\n{}\n", text.as_str()),
                    }
                    redisplay_prompt(&user_id_for_read);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Hub closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    let user_id = config.user_id.clone();
    let mut write_task = tokio::spawn(async move {
        let mut input = input.lock().await;

        while let Some(line) = input.lines.recv().await {
            let frame = match input.parser.parse(&line) {
                Ok(Command::Send(frame)) => frame,
                Ok(Command::ListOnline) => {
                    match fetch_online_users(online_url.clone()).await {
                        Ok(online) => print!("{}", MessageFormatter::format_online_users(&online)),
                        Err(e) => println!("\n! {}", e),
                    }
                    redisplay_prompt(&user_id);
                    continue;
                }
                Ok(Command::Quit) => return Ok(()),
                Err(e) => {
                    println!("\n! {}", e);
                    redisplay_prompt(&user_id);
                    continue;
                }
            };

            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize frame: {}", e);
                    continue;
                }
            };

            if let Err(e) = write.send(Message::Text(json.into())).await {
                tracing::warn!("Failed to send frame: {}", e);
                return Err(ClientError::ConnectionError(e.to_string()));
            }
        }

        // Terminal input closed (Ctrl+C / Ctrl+D)
        write.send(Message::Close(None)).await.ok();
        Ok(())
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
            Err(ClientError::ConnectionError("Connection lost".to_string()))
        }
        write_result = &mut write_task => {
            read_task.abort();
            write_result.unwrap_or_else(|e| Err(ClientError::ConnectionError(e.to_string())))
        }
    }
}
