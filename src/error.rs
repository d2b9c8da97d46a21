//! Error types for wxlink operations
//!
//! All recoverable conditions are surfaced as [`WxlinkError`] at the
//! component boundary; nothing here is expected to abort the process.

use thiserror::Error;

/// Result type alias for wxlink operations
pub type Result<T> = std::result::Result<T, WxlinkError>;

/// Error types for session, stream and command operations
#[derive(Error, Debug)]
pub enum WxlinkError {
    /// Empty or unparseable device address, rejected before any I/O
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Stream send attempted outside the `Connected` state
    #[error("not connected to device")]
    NotConnected,

    /// Non-numeric manual override input, rejected before any state change
    #[error("invalid override value: {0:?}")]
    InvalidOverrideValue(String),

    /// Connection open/close or in-flight stream failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Command channel request failures
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl WxlinkError {
    /// Create an invalid endpoint error
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::InvalidEndpoint(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}
