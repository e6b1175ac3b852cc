//! Terminal client for the Gymates real-time hub.
//!
//! Reads commands from the terminal, sends them as frames over one
//! WebSocket connection and prints every frame the hub pushes back.

pub mod command;
pub mod error;
pub mod formatter;
pub mod runner;
mod session;
mod ui;

pub use runner::{ClientConfig, run_client};
