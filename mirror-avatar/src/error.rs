//! Error types for the avatar application.

use mirror_music::MusicError;
use mirror_realtime::{LiveError, ToolExecutionError};
use thiserror::Error;

/// Result type for avatar operations.
pub type Result<T> = std::result::Result<T, AvatarError>;

#[derive(Error, Debug)]
pub enum AvatarError {
    /// Live session failure.
    #[error(transparent)]
    Live(#[from] LiveError),

    /// Music session failure.
    #[error(transparent)]
    Music(#[from] MusicError),

    /// Invalid or unreadable application config.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Image generation failed. The message is shown to the model as is.
    #[error("{0}")]
    ImageError(String),

    /// Camera capture failed.
    #[error("Camera error: {0}")]
    CameraError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AvatarError {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new image error.
    pub fn image<S: Into<String>>(msg: S) -> Self {
        Self::ImageError(msg.into())
    }

    /// Create a new camera error.
    pub fn camera<S: Into<String>>(msg: S) -> Self {
        Self::CameraError(msg.into())
    }
}

impl From<AvatarError> for ToolExecutionError {
    fn from(err: AvatarError) -> Self {
        ToolExecutionError::new(err.to_string())
    }
}
