//! Gap-free playback scheduling.

use crate::error::{AudioError, Result};
use crate::output::SharedOutput;
use crate::pcm::{DecodedBuffer, PcmFormat, decode_pcm16};
use parking_lot::Mutex;

/// Where a buffer landed on the output clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledSpan {
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl ScheduledSpan {
    /// End time in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

#[derive(Debug)]
struct CursorState {
    running: bool,
    next_start_time: f64,
    gain: f32,
}

/// Schedules decoded PCM chunks back to back on an [`AudioOutput`] clock.
///
/// Each buffer starts where the previous one ends. When the clock has
/// already moved past that point (a network stall), the cursor snaps forward
/// to the current time instead of building up a backlog.
///
/// [`stop`](Self::stop) silences anything still queued on the output and
/// rewinds the cursor to zero, so the next [`start`](Self::start) begins a
/// fresh timeline.
///
/// [`AudioOutput`]: crate::output::AudioOutput
pub struct PlaybackScheduler {
    output: SharedOutput,
    format: PcmFormat,
    state: Mutex<CursorState>,
}

impl PlaybackScheduler {
    /// Default output gain.
    pub const DEFAULT_GAIN: f32 = 0.5;

    /// Create a stopped scheduler for chunks of `format`.
    pub fn new(output: SharedOutput, format: PcmFormat) -> Self {
        output.set_gain(Self::DEFAULT_GAIN);
        Self {
            output,
            format,
            state: Mutex::new(CursorState {
                running: false,
                next_start_time: 0.0,
                gain: Self::DEFAULT_GAIN,
            }),
        }
    }

    /// Format expected by [`submit`](Self::submit).
    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Begin accepting chunks.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if !state.running {
            tracing::debug!(sample_rate = self.format.sample_rate, "Playback started");
        }
        state.running = true;
    }

    /// Stop scheduling, silence queued buffers and rewind the cursor.
    ///
    /// Safe to call any number of times.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if state.running {
            tracing::debug!(sample_rate = self.format.sample_rate, "Playback stopped");
        }
        state.running = false;
        state.next_start_time = 0.0;
        self.output.silence();
    }

    /// Whether [`start`](Self::start) was called since the last stop.
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Clock time at which the next buffer will begin.
    pub fn next_start_time(&self) -> f64 {
        self.state.lock().next_start_time
    }

    /// Set playback volume (`0.0..=1.0`).
    pub fn set_volume(&self, level: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&level) {
            return Err(AudioError::InvalidVolume(level));
        }
        self.state.lock().gain = level;
        self.output.set_gain(level);
        Ok(())
    }

    /// Current playback volume.
    pub fn volume(&self) -> f32 {
        self.state.lock().gain
    }

    /// Decode a raw PCM16 chunk and schedule it.
    ///
    /// Returns `Ok(None)` when the scheduler is stopped or the chunk is empty.
    /// A malformed chunk is rejected without touching the cursor.
    pub fn submit(&self, chunk: &[u8]) -> Result<Option<ScheduledSpan>> {
        let buffer = decode_pcm16(chunk, self.format)?;
        Ok(self.schedule(buffer))
    }

    /// Schedule an already decoded buffer.
    pub fn schedule(&self, buffer: DecodedBuffer) -> Option<ScheduledSpan> {
        if buffer.is_empty() {
            return None;
        }

        let mut state = self.state.lock();
        if !state.running {
            tracing::trace!(frames = buffer.frame_count(), "Dropping chunk while stopped");
            return None;
        }

        let now = self.output.current_time();
        if now > state.next_start_time {
            state.next_start_time = now;
        }

        let span = ScheduledSpan { start: state.next_start_time, duration: buffer.duration() };
        state.next_start_time += span.duration;

        // Keep the lock so concurrent submits reach the output in cursor order.
        self.output.schedule(buffer, span.start);
        Some(span)
    }
}

impl std::fmt::Debug for PlaybackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PlaybackScheduler")
            .field("format", &self.format)
            .field("running", &state.running)
            .field("next_start_time", &state.next_start_time)
            .finish()
    }
}
