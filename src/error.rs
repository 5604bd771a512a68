//! Error types for configuration, control calls, and the event stream.
//!
//! Rejected console operations (start while a run is active, approve with
//! nothing pending, end with nothing active) are not errors; they surface as
//! `RuntimeEvent::Rejected` instead.

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Errors from outbound control calls.
#[derive(Debug)]
pub enum ApiError {
    /// Network / reqwest-level error.
    Http(reqwest::Error),
    /// Non-2xx status from the backend.
    Status { code: u16, message: String },
    /// Reply could not be read.
    InvalidResponse(String),
    /// No backend base URL is configured.
    NotConfigured(String),
}

impl ApiError {
    /// HTTP status code for status-class failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Short message surfaced to the operator and used as a failure reason.
    pub fn operator_message(&self) -> String {
        match self {
            Self::Http(e) if e.is_timeout() => "request timed out".to_string(),
            Self::Http(e) => e.to_string(),
            Self::Status { code, message } if message.is_empty() => format!("status {code}"),
            Self::Status { message, .. } => message.clone(),
            Self::InvalidResponse(msg) | Self::NotConfigured(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Status { code, message } => write!(f, "status {code}: {message}"),
            Self::InvalidResponse(msg) => write!(f, "invalid response: {msg}"),
            Self::NotConfigured(msg) => write!(f, "not configured: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

// ---------------------------------------------------------------------------
// StreamError
// ---------------------------------------------------------------------------

/// Transport failures inside the streaming client.
///
/// These never leave the stream loop as `Err`; they are reported as
/// `StreamEvent::Error` and followed by a scheduled reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    NotConfigured(String),
    Connect(String),
    Transport(String),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured(msg) => write!(f, "stream not configured: {msg}"),
            Self::Connect(msg) => write!(f, "connect failed: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
