//! Utilities shared by the Gymates hub server and client.

pub mod logger;
pub mod time;
