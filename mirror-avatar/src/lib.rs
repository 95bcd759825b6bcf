//! # mirror-avatar
//!
//! The Magic Mirror: a talking avatar that sees the visitor through a
//! camera, answers by voice, disguises them, illustrates stories and plays
//! music.
//!
//! ```text
//!            ┌──────────── AvatarSession ─────────────┐
//!  camera ──►│ FramePump ──► LiveClient ──► SpeechPlayback ──► speakers
//!            │                   │                     │
//!            │             ToolRegistry ──► ImageBoard  │
//!            │                   └────────► MusicPlayer ──► speakers
//!            └────────────────────────────────────────┘
//! ```

pub mod camera;
pub mod config;
pub mod error;
pub mod images;
pub mod playback;
pub mod session;
pub mod tools;

pub use camera::{CameraSource, FRAME_INTERVAL, FramePump, Orientation, SharedCamera};
pub use config::{AppConfig, AutoStart, CameraSettings, LanguagePreset, MusicSettings};
pub use error::{AvatarError, Result};
pub use images::{ImageBoard, ImageChat, ImageClient, SharedChat, first_image};
pub use playback::SpeechPlayback;
pub use session::{AvatarSession, AvatarSessionBuilder};
pub use tools::{ToolContext, avatar_tools};
