//! PCM16 chunk and decoded buffer types.

use crate::error::{AudioError, Result};
use serde::{Deserialize, Serialize};

/// Sample rate of generated music (Lyria).
pub const MUSIC_SAMPLE_RATE: u32 = 44_100;

/// Sample rate of live-session speech output.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Interleaved 16-bit PCM layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::stereo_44khz()
    }
}

impl PcmFormat {
    /// Create a new PCM16 format.
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self { sample_rate, channels }
    }

    /// Stereo at 44.1kHz (music stream).
    pub const fn stereo_44khz() -> Self {
        Self::new(MUSIC_SAMPLE_RATE, 2)
    }

    /// Mono at 24kHz (speech stream).
    pub const fn mono_24khz() -> Self {
        Self::new(SPEECH_SAMPLE_RATE, 1)
    }

    /// Bytes in one interleaved frame (2 bytes per sample).
    pub fn frame_size(&self) -> usize {
        self.channels as usize * 2
    }

    /// Parse the rate out of a mime type such as `audio/pcm;rate=24000`.
    ///
    /// Unknown or missing parameters fall back to `self`.
    pub fn with_mime_type(self, mime_type: &str) -> Self {
        let mut format = self;
        for param in mime_type.split(';').skip(1) {
            let Some((key, value)) = param.trim().split_once('=') else {
                continue;
            };
            match key.trim() {
                "rate" => {
                    if let Ok(rate) = value.trim().parse() {
                        format.sample_rate = rate;
                    }
                }
                "channels" => {
                    if let Ok(channels) = value.trim().parse() {
                        format.channels = channels;
                    }
                }
                _ => {}
            }
        }
        format
    }
}

/// Planar float samples decoded from one PCM16 chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl DecodedBuffer {
    /// Build a buffer from planar channel data.
    ///
    /// All channels must have the same length.
    pub fn from_planar(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        debug_assert!(channels.windows(2).all(|w| w[0].len() == w[1].len()));
        Self { channels, sample_rate }
    }

    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples of channel `index`.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Playback duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Whether the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }
}

/// Decode interleaved little-endian PCM16 into planar `f32` in `[-1.0, 1.0)`.
///
/// Fails with [`AudioError::InvalidChunk`] when `bytes` is not a whole number
/// of frames.
pub fn decode_pcm16(bytes: &[u8], format: PcmFormat) -> Result<DecodedBuffer> {
    if format.channels == 0 {
        return Err(AudioError::format("PCM format must have at least one channel"));
    }
    let frame_size = format.frame_size();
    if bytes.len() % frame_size != 0 {
        return Err(AudioError::InvalidChunk { len: bytes.len(), frame_size });
    }

    let frame_count = bytes.len() / frame_size;
    let channel_count = format.channels as usize;
    let mut channels = vec![Vec::with_capacity(frame_count); channel_count];

    for frame in bytes.chunks_exact(frame_size) {
        for (channel, sample) in channels.iter_mut().zip(frame.chunks_exact(2)) {
            let value = i16::from_le_bytes([sample[0], sample[1]]);
            channel.push(value as f32 / 32768.0);
        }
    }

    Ok(DecodedBuffer { channels, sample_rate: format.sample_rate })
}
