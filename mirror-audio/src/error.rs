//! Error types for audio decoding and playback.

use thiserror::Error;

/// Result type for audio operations.
pub type Result<T> = std::result::Result<T, AudioError>;

/// Errors that can occur while decoding or playing audio.
#[derive(Error, Debug)]
pub enum AudioError {
    /// Chunk length is not a whole number of PCM frames.
    #[error("Invalid audio chunk: {len} bytes is not a multiple of the {frame_size}-byte frame")]
    InvalidChunk {
        /// Length of the rejected chunk in bytes.
        len: usize,
        /// Size of one interleaved frame in bytes.
        frame_size: usize,
    },

    /// Unsupported PCM format.
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Volume outside of `0.0..=1.0`.
    #[error("Volume level must be between 0 and 1, got {0}")]
    InvalidVolume(f32),

    /// Output device error.
    #[error("Audio device error: {0}")]
    Device(String),
}

impl AudioError {
    /// Create a new device error.
    pub fn device<S: Into<String>>(msg: S) -> Self {
        Self::Device(msg.into())
    }

    /// Create a new unsupported format error.
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedFormat(msg.into())
    }
}
