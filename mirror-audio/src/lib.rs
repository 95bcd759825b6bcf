//! # mirror-audio
//!
//! Audio plumbing for the Magic Mirror live avatar.
//!
//! Incoming speech and music arrive as chunks of 16-bit interleaved PCM. This
//! crate decodes each chunk into planar `f32` buffers and schedules them
//! back to back against the clock of an [`AudioOutput`], so playback stays
//! gap-free no matter how irregularly the network delivers chunks.
//!
//! ```text
//!   PCM16 chunk ──► decode_pcm16 ──► PlaybackScheduler ──► AudioOutput
//!                                    (next_start_time)     (clock)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mirror_audio::{PcmFormat, PlaybackScheduler, testing::ManualOutput};
//!
//! let output = Arc::new(ManualOutput::new());
//! let scheduler = PlaybackScheduler::new(output.clone(), PcmFormat::stereo_44khz());
//! scheduler.start();
//!
//! // 441 stereo frames = 10ms of audio
//! let span = scheduler.submit(&[0u8; 441 * 4]).unwrap().unwrap();
//! assert_eq!(span.start, 0.0);
//! assert!((scheduler.next_start_time() - 0.01).abs() < 1e-9);
//! ```

pub mod error;
pub mod output;
pub mod pcm;
pub mod scheduler;
pub mod testing;

#[cfg(feature = "desktop-audio")]
pub mod device;

pub use error::{AudioError, Result};
pub use output::{AudioOutput, SharedOutput};
pub use pcm::{DecodedBuffer, PcmFormat, decode_pcm16};
pub use scheduler::{PlaybackScheduler, ScheduledSpan};

#[cfg(feature = "desktop-audio")]
pub use device::DeviceOutput;
