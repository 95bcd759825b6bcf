//! Test double for [`AudioOutput`] with a hand-driven clock.

use crate::output::AudioOutput;
use crate::pcm::DecodedBuffer;
use crate::scheduler::ScheduledSpan;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct ManualState {
    time: f64,
    gain: f32,
    scheduled: Vec<ScheduledSpan>,
    pending: Vec<ScheduledSpan>,
    silenced: usize,
}

/// An [`AudioOutput`] that records what was scheduled instead of playing it.
///
/// The clock only moves when [`set_time`](Self::set_time) or
/// [`advance`](Self::advance) is called.
#[derive(Debug, Default)]
pub struct ManualOutput {
    state: Mutex<ManualState>,
}

impl ManualOutput {
    /// Create an output with the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock to `time` seconds.
    pub fn set_time(&self, time: f64) {
        self.state.lock().time = time;
    }

    /// Move the clock forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        self.state.lock().time += seconds;
    }

    /// Every span ever scheduled, in scheduling order.
    pub fn scheduled(&self) -> Vec<ScheduledSpan> {
        self.state.lock().scheduled.clone()
    }

    /// Spans that have not finished and were not silenced.
    pub fn pending(&self) -> Vec<ScheduledSpan> {
        let state = self.state.lock();
        state.pending.iter().filter(|span| span.end() > state.time).copied().collect()
    }

    /// Number of times [`AudioOutput::silence`] was called.
    pub fn silence_count(&self) -> usize {
        self.state.lock().silenced
    }

    /// Last gain set.
    pub fn gain(&self) -> f32 {
        self.state.lock().gain
    }
}

impl AudioOutput for ManualOutput {
    fn current_time(&self) -> f64 {
        self.state.lock().time
    }

    fn schedule(&self, buffer: DecodedBuffer, start_at: f64) {
        let span = ScheduledSpan { start: start_at, duration: buffer.duration() };
        let mut state = self.state.lock();
        state.scheduled.push(span);
        state.pending.push(span);
    }

    fn silence(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        state.silenced += 1;
    }

    fn set_gain(&self, gain: f32) {
        self.state.lock().gain = gain;
    }
}
