//! Inbox error types.

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, NotificationError>;

/// Errors that can occur while acquiring or confirming notifications.
///
/// None of these are surfaced to the end user. Transport and payload errors
/// are logged and the feed degrades to "possibly stale"; connection errors
/// drive the reconnect state machine.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// HTTP transport failure (DNS, TLS, connection reset, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the notification endpoint.
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response or frame body that does not have the expected shape.
    #[error("Malformed payload: {0}")]
    Payload(String),

    /// The server answered but reported `success: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Connection-related errors (WebSocket open, read, write).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Frame encoding errors.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid base or endpoint URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The manager task is gone.
    #[error("Notification manager closed")]
    Closed,
}

impl NotificationError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a payload error.
    pub fn payload(msg: impl Into<String>) -> Self {
        Self::Payload(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came from the wire rather than from local state.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Payload(_) | Self::Connection(_)
        )
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Payload(err.to_string())
    }
}
