//! Error types for the live session adapter.

use thiserror::Error;

/// Result type for live session operations.
pub type Result<T> = std::result::Result<T, LiveError>;

/// Errors that can occur during live session operations.
#[derive(Error, Debug)]
pub enum LiveError {
    /// Handshake or transport failure.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Malformed or unexpected message.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// No live session is open.
    #[error("Session not connected")]
    NotConnected,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Server reported an error.
    #[error("Server error: {0}")]
    ServerError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl LiveError {
    /// Create a new connection error.
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a new protocol error.
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Self::ProtocolError(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionError(_) | Self::NotConnected)
    }
}

/// Failure raised by a tool handler.
///
/// The message is sent back to the model verbatim in the `error` field of
/// the function response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ToolExecutionError {
    message: String,
}

impl ToolExecutionError {
    /// Create a tool error with the given message.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into() }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<LiveError> for ToolExecutionError {
    fn from(err: LiveError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<String> for ToolExecutionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ToolExecutionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
