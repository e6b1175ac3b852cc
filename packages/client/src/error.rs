//! Error types for the terminal client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The hub refused the identity presented on upgrade (HTTP 401)
    #[error("the hub rejected the credentials for '{0}'")]
    Unauthorized(String),

    #[error("invalid hub URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection error
    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}
