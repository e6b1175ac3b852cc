//! WebSocket hub server implementation.

pub mod dispatcher;
pub mod handler;
mod server;
mod signal;
pub mod state;

pub use dispatcher::{DispatchOutcome, FrameDispatcher};
pub use server::Server;
pub use state::AppState;
