//! Gymates real-time messaging hub.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gymates-hub-server
//! cargo run --bin gymates-hub-server -- --host 0.0.0.0 --port 3000
//! cargo run --bin gymates-hub-server -- --auth-mode token --tokens-file tokens.json
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use gymates_hub_server::{
    config::{AuthMode, ServerConfig},
    ui::{AppState, Server},
};
use gymates_hub_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "gymates-hub-server")]
#[command(about = "Real-time messaging hub: presence, chat, typing, notifications and call signaling", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// How the connection's user id is established
    #[arg(long, value_enum, default_value_t = AuthMode::Query)]
    auth_mode: AuthMode,

    /// JSON object mapping token -> user_id (required for --auth-mode token)
    #[arg(long)]
    tokens_file: Option<PathBuf>,

    /// Expire unanswered call invites after this many seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    call_invite_timeout_secs: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            auth_mode: args.auth_mode,
            tokens_file: args.tokens_file,
            call_invite_timeout_secs: args.call_invite_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let config = ServerConfig::from(Args::parse());

    // Initialize dependencies in order:
    // 1. Authenticator
    // 2. AppState (registry, repositories, use cases)
    // 3. Server
    let authenticator = match config.authenticator() {
        Ok(authenticator) => authenticator,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let state = AppState::in_memory(authenticator, Arc::new(SystemClock));
    let server = Server::new(state, config.call_invite_timeout());

    if let Err(e) = server.run(config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
