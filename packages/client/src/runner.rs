//! Client execution logic with reconnection support.

use std::{sync::Arc, time::Duration};

use gymates_hub_shared::time::SystemClock;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{Mutex, mpsc};

use crate::{
    command::CommandParser,
    error::ClientError,
    session::{Input, run_client_session},
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Where to connect and as whom
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:8080/ws`
    pub url: String,
    pub user_id: String,
    pub token: Option<String>,
}

/// Read terminal lines on a blocking thread (rustyline is synchronous)
fn spawn_readline(user_id: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", user_id);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}

/// Run the WebSocket client with reconnection logic.
///
/// A rejected identity (HTTP 401) is returned immediately without retrying.
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let input = Arc::new(Mutex::new(Input {
        lines: spawn_readline(config.user_id.clone()),
        parser: CommandParser::new(Arc::new(SystemClock)),
    }));
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} as '{}' (attempt {}/{})",
            config.url,
            config.user_id,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_client_session(&config, input.clone()).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Err(e @ (ClientError::Unauthorized(_) | ClientError::InvalidUrl { .. })) => {
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);
                reconnect_count += 1;

                if reconnect_count >= MAX_RECONNECT_ATTEMPTS {
                    return Err(ClientError::ConnectionError(format!(
                        "failed to reconnect after {} attempts",
                        MAX_RECONNECT_ATTEMPTS
                    )));
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );

                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }
}
