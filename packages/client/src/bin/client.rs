//! Terminal client for the Gymates real-time hub.
//!
//! Connects as one user, sends commands typed at the prompt as frames and
//! prints whatever the hub pushes back (chat, presence, typing, calls,
//! notifications). Automatically reconnects on disconnection (max 5
//! attempts with 5 second interval). A rejected identity exits at once.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gymates-hub-client -- --user-id alice
//! cargo run --bin gymates-hub-client -- -i bob --token secret-bob
//! ```

use clap::Parser;

use gymates_hub_client::{ClientConfig, run_client};
use gymates_hub_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "gymates-hub-client")]
#[command(about = "Terminal client for the Gymates real-time hub", long_about = None)]
struct Args {
    /// User ID to connect as
    #[arg(short = 'i', long)]
    user_id: String,

    /// Hub WebSocket URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Bearer token (required when the hub runs with --auth-mode token)
    #[arg(short = 't', long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = ClientConfig {
        url: args.url,
        user_id: args.user_id,
        token: args.token,
    };

    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
