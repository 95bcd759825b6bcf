//! Error types for music streaming.

use thiserror::Error;

/// Result type for music operations.
pub type Result<T> = std::result::Result<T, MusicError>;

/// Errors that can occur while streaming music.
#[derive(Error, Debug)]
pub enum MusicError {
    /// Handshake or transport failure.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Malformed or unexpected message.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// No music session is open.
    #[error("Music session not connected")]
    NotConnected,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Prompt synthesis failed.
    #[error("Prompt generation failed: {0}")]
    PromptError(String),

    /// Decoding or playback failure.
    #[error(transparent)]
    Audio(#[from] mirror_audio::AudioError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl MusicError {
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

    /// Create a new prompt generation error.
    pub fn prompt<S: Into<String>>(msg: S) -> Self {
        Self::PromptError(msg.into())
    }

    /// Whether the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionError(_) | Self::NotConnected)
    }
}
