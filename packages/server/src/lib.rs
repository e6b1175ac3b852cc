//! Gymates real-time messaging hub.
//!
//! Tracks which users are connected, which chat rooms they are subscribed to
//! and which call sessions they take part in, and routes frames between them
//! over one WebSocket per user.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
