//! Output device abstraction.

use crate::pcm::DecodedBuffer;
use std::sync::Arc;

/// An audio sink with its own monotonic clock.
///
/// Implementations mix every scheduled buffer into the device stream,
/// starting each one at the requested clock time. Scheduling is
/// fire-and-forget: nothing signals when a buffer finishes.
pub trait AudioOutput: Send + Sync {
    /// Current time of the output clock in seconds.
    fn current_time(&self) -> f64;

    /// Queue `buffer` to begin playing at `start_at` seconds on the clock.
    ///
    /// A start time already in the past plays immediately.
    fn schedule(&self, buffer: DecodedBuffer, start_at: f64);

    /// Drop every buffer that has not finished playing.
    fn silence(&self);

    /// Set the output gain (`0.0..=1.0`).
    fn set_gain(&self, gain: f32);
}

/// A shared output handle.
pub type SharedOutput = Arc<dyn AudioOutput>;
