//! # mirror-music
//!
//! Realtime generated music for the Magic Mirror avatar.
//!
//! A [`MusicPlayer`] opens a music session on first use, steers it with
//! [`WeightedPrompt`]s and plays the returned 44.1kHz stereo PCM gaplessly
//! through a [`mirror_audio::PlaybackScheduler`].
//!
//! ```rust,ignore
//! use mirror_music::{MusicPlayer, WeightedPrompt};
//! use mirror_music::lyria::LyriaTransport;
//!
//! let player = MusicPlayer::new(Arc::new(LyriaTransport::from_env()?), output);
//! player.play(vec![WeightedPrompt::new("Minimal techno")]).await?;
//! ```

pub mod error;
pub mod mock;
pub mod player;
pub mod prompts;
pub mod session;

#[cfg(feature = "lyria")]
pub mod lyria;

#[cfg(feature = "prompt-writer")]
pub mod writer;

pub use error::{MusicError, Result};
pub use player::{DEFAULT_TOGGLE_PROMPT, MusicPlayer, MusicPlayerConfig};
pub use prompts::{DEFAULT_PROMPT_MODEL, MusicPromptWriter, WeightedPrompt};
pub use session::{
    BoxedMusicConnection, MusicConnection, MusicMessage, MusicTransport, PlaybackControl,
};
