//! Plays the avatar's speech and tracks whether it is talking.

use async_trait::async_trait;
use bytes::Bytes;
use mirror_audio::{PcmFormat, PlaybackScheduler, SharedOutput, decode_pcm16};
use mirror_realtime::LiveEventListener;
use std::time::Duration;

/// Schedules speech audio from the live session on its own output.
///
/// Session open starts the timeline, an interruption silences what is queued
/// and restarts it, close stops it.
pub struct SpeechPlayback {
    scheduler: PlaybackScheduler,
    output: SharedOutput,
    grace_period: Duration,
}

impl SpeechPlayback {
    pub fn new(output: SharedOutput, grace_period: Duration) -> Self {
        Self {
            scheduler: PlaybackScheduler::new(output.clone(), PcmFormat::mono_24khz()),
            output,
            grace_period,
        }
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    /// Whether speech is audible, or ended less than the grace period ago.
    pub fn is_talking(&self) -> bool {
        if !self.scheduler.is_running() {
            return false;
        }
        let end = self.scheduler.next_start_time();
        end > 0.0 && self.output.current_time() < end + self.grace_period.as_secs_f64()
    }

    /// Decode and queue one speech chunk; the rate comes from `mime_type`.
    pub fn play_chunk(&self, data: &[u8], mime_type: &str) {
        let format = self.scheduler.format().with_mime_type(mime_type);
        match decode_pcm16(data, format) {
            Ok(buffer) => {
                self.scheduler.schedule(buffer);
            }
            Err(e) => tracing::warn!(error = %e, %mime_type, "Dropping speech chunk"),
        }
    }
}

impl std::fmt::Debug for SpeechPlayback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechPlayback")
            .field("scheduler", &self.scheduler)
            .field("grace_period", &self.grace_period)
            .finish()
    }
}

#[async_trait]
impl LiveEventListener for SpeechPlayback {
    async fn on_open(&self) -> mirror_realtime::Result<()> {
        self.scheduler.start();
        Ok(())
    }

    async fn on_close(&self, _reason: Option<&str>) -> mirror_realtime::Result<()> {
        self.scheduler.stop();
        Ok(())
    }

    async fn on_audio(&self, data: &Bytes, mime_type: &str) -> mirror_realtime::Result<()> {
        self.play_chunk(data, mime_type);
        Ok(())
    }

    async fn on_interrupted(&self) -> mirror_realtime::Result<()> {
        tracing::debug!("Speech interrupted");
        self.scheduler.stop();
        self.scheduler.start();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_audio::testing::ManualOutput;
    use std::sync::Arc;

    fn playback() -> (Arc<ManualOutput>, SpeechPlayback) {
        let output = Arc::new(ManualOutput::new());
        (output.clone(), SpeechPlayback::new(output, Duration::from_millis(500)))
    }

    #[tokio::test]
    async fn test_rate_follows_mime_type() {
        let (output, playback) = playback();
        playback.on_open().await.unwrap();

        // 160 mono frames at 16kHz = 10 ms
        playback.on_audio(&Bytes::from(vec![0u8; 320]), "audio/pcm;rate=16000").await.unwrap();
        let spans = output.scheduled();
        assert_eq!(spans.len(), 1);
        assert!((spans[0].duration - 0.01).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_talking_with_grace_period() {
        let (output, playback) = playback();
        assert!(!playback.is_talking());

        playback.on_open().await.unwrap();
        assert!(!playback.is_talking());

        // 2400 frames at 24kHz = 100 ms
        playback.on_audio(&Bytes::from(vec![0u8; 4800]), "audio/pcm").await.unwrap();
        assert!(playback.is_talking());

        output.set_time(0.5);
        assert!(playback.is_talking());
        output.set_time(0.7);
        assert!(!playback.is_talking());
    }

    #[tokio::test]
    async fn test_interruption_restarts_timeline() {
        let (output, playback) = playback();
        playback.on_open().await.unwrap();
        playback.on_audio(&Bytes::from(vec![0u8; 4800]), "audio/pcm").await.unwrap();

        playback.on_interrupted().await.unwrap();
        assert_eq!(output.silence_count(), 1);
        assert!(playback.scheduler().is_running());
        assert_eq!(playback.scheduler().next_start_time(), 0.0);

        playback.on_close(None).await.unwrap();
        assert!(!playback.scheduler().is_running());
    }

    #[tokio::test]
    async fn test_odd_chunk_is_dropped() {
        let (output, playback) = playback();
        playback.on_open().await.unwrap();
        playback.on_audio(&Bytes::from(vec![0u8; 3]), "audio/pcm").await.unwrap();
        assert!(output.scheduled().is_empty());
    }
}
