//! Server configuration.
//!
//! Command-line arguments are parsed by the binary and turned into a
//! [`ServerConfig`]; everything that can be wrong about them is reported as a
//! [`ConfigError`] before the server binds.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::ValueEnum;
use thiserror::Error;

use crate::{
    domain::{Authenticator, UserId, ValueObjectError},
    infrastructure::auth::{QueryParamAuthenticator, StaticTokenAuthenticator},
};

/// How a connection's user identifier is established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AuthMode {
    /// Trust the `user_id` query parameter
    #[default]
    Query,
    /// Resolve the `token` query parameter through a token table
    Token,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--auth-mode token requires --tokens-file")]
    MissingTokensFile,

    #[error("failed to read tokens file {path}: {source}")]
    ReadTokensFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tokens file {path} is not a JSON object of token -> user_id: {source}")]
    ParseTokensFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("tokens file {0} contains no tokens")]
    EmptyTokensFile(PathBuf),

    #[error("tokens file maps a token to an invalid user id: {0}")]
    InvalidUserId(#[from] ValueObjectError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub auth_mode: AuthMode,
    pub tokens_file: Option<PathBuf>,
    /// `0` disables invite expiry
    pub call_invite_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            auth_mode: AuthMode::Query,
            tokens_file: None,
            call_invite_timeout_secs: 0,
        }
    }
}

impl ServerConfig {
    pub fn call_invite_timeout(&self) -> Option<Duration> {
        (self.call_invite_timeout_secs > 0)
            .then(|| Duration::from_secs(self.call_invite_timeout_secs))
    }

    /// Build the authenticator selected by `auth_mode`
    pub fn authenticator(&self) -> Result<Arc<dyn Authenticator>, ConfigError> {
        match self.auth_mode {
            AuthMode::Query => {
                if self.tokens_file.is_some() {
                    tracing::warn!("--tokens-file is ignored with --auth-mode query");
                }
                Ok(Arc::new(QueryParamAuthenticator))
            }
            AuthMode::Token => {
                let path = self
                    .tokens_file
                    .as_deref()
                    .ok_or(ConfigError::MissingTokensFile)?;
                let authenticator = load_token_table(path)?;
                tracing::info!(
                    "Loaded {} tokens from {}",
                    authenticator.len(),
                    path.display()
                );
                Ok(Arc::new(authenticator))
            }
        }
    }
}

/// Read a JSON token table (`{"token": "user_id", ...}`) from disk
pub fn load_token_table(path: &Path) -> Result<StaticTokenAuthenticator, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadTokensFile {
        path: path.to_path_buf(),
        source,
    })?;
    let entries: HashMap<String, String> =
        serde_json::from_str(&raw).map_err(|source| ConfigError::ParseTokensFile {
            path: path.to_path_buf(),
            source,
        })?;
    if entries.is_empty() {
        return Err(ConfigError::EmptyTokensFile(path.to_path_buf()));
    }

    let tokens = entries
        .into_iter()
        .map(|(token, user_id)| Ok((token, UserId::new(user_id)?)))
        .collect::<Result<HashMap<_, _>, ValueObjectError>>()?;
    Ok(StaticTokenAuthenticator::new(tokens))
}
