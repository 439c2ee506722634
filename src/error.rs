//! Error types for the fishing bot
//!
//! Defines application-level errors and handle send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (token refresh, bad configuration) and
/// internal plumbing errors. Transport failures never surface here:
/// they are converted to boolean/log outcomes at the session boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (config file access)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error during token refresh (fatal to the run attempt)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token endpoint answered but did not grant a token
    #[error("token refresh failed: {0}")]
    TokenRefresh(String),

    /// Malformed configuration file
    #[error("config error: {0}")]
    Config(String),

    /// Required configuration key absent
    #[error("missing config key: {0}")]
    MissingKey(&'static str),

    /// Channel send error (internal channel broken)
    #[error("channel send error")]
    ChannelSend,
}

/// Message send errors
///
/// Occurs when attempting to send outbound lines through a closed channel.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("channel closed")]
    ChannelClosed,
}
