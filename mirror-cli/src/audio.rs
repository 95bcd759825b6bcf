//! Audio outputs for the CLI.
//!
//! Speech and music each get their own output, so silencing speech on an
//! interruption never cuts the music.

use anyhow::Result;
use mirror_audio::{AudioOutput, DecodedBuffer, SharedOutput};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Open one output for the default device.
#[cfg(feature = "desktop-audio")]
pub fn open_output(label: &str) -> Result<SharedOutput> {
    let output = mirror_audio::DeviceOutput::open_default()?;
    tracing::info!(label, sample_rate = output.sample_rate(), "Opened audio device");
    Ok(Arc::new(output))
}

/// Without a device, audio is timed against the wall clock and discarded.
#[cfg(not(feature = "desktop-audio"))]
pub fn open_output(label: &str) -> Result<SharedOutput> {
    tracing::warn!(label, "Built without desktop-audio; audio is discarded");
    Ok(Arc::new(WallClockOutput::new()))
}

/// An output that keeps time but plays nothing.
pub struct WallClockOutput {
    started: Instant,
    state: Mutex<(f64, f32)>,
}

impl WallClockOutput {
    pub fn new() -> Self {
        Self { started: Instant::now(), state: Mutex::new((0.0, 1.0)) }
    }

    /// Clock time at which everything scheduled so far has played.
    pub fn queued_until(&self) -> f64 {
        self.state.lock().0
    }
}

impl Default for WallClockOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for WallClockOutput {
    fn current_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn schedule(&self, buffer: DecodedBuffer, start_at: f64) {
        let mut state = self.state.lock();
        state.0 = state.0.max(start_at + buffer.duration());
        tracing::trace!(start_at, frames = buffer.frame_count(), "Discarding audio");
    }

    fn silence(&self) {
        self.state.lock().0 = self.current_time();
    }

    fn set_gain(&self, gain: f32) {
        self.state.lock().1 = gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_tracks_queue() {
        let output = WallClockOutput::new();
        output.schedule(DecodedBuffer::from_planar(vec![vec![0.0; 2400]], 24_000), 1.0);
        assert!((output.queued_until() - 1.1).abs() < 1e-9);

        output.silence();
        assert!(output.queued_until() < 1.0);
        assert!(output.current_time() >= 0.0);
    }
}
