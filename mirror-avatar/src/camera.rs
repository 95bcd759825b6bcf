//! Camera capture and the frame pump that streams it to the live session.

use crate::error::Result;
use async_trait::async_trait;
use mirror_realtime::{Blob, LiveClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Interval between frames sent to the live session.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(500);

/// How the camera is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    /// Mounted sideways; still captures are rotated a quarter turn.
    Vertical,
}

/// A source of JPEG frames.
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Capture one frame. `Vertical` asks for a frame rotated upright.
    async fn capture_jpeg(&self, orientation: Orientation) -> Result<Vec<u8>>;
}

pub type SharedCamera = Arc<dyn CameraSource>;

/// Streams camera frames as realtime input while the session is set up.
///
/// Frames are skipped, not queued, while the session is not ready. Dropping
/// the pump stops it.
#[derive(Debug)]
pub struct FramePump {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl FramePump {
    /// Start pumping every [`FRAME_INTERVAL`].
    pub fn start(client: LiveClient, camera: SharedCamera) -> Self {
        Self::with_interval(client, camera, FRAME_INTERVAL)
    }

    pub fn with_interval(client: LiveClient, camera: SharedCamera, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_pump(client, camera, period, cancel.clone()));
        Self { cancel, handle }
    }

    /// Whether the pump task is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop pumping and wait for the task to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for FramePump {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_pump(
    client: LiveClient,
    camera: SharedCamera,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut sent: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !client.is_setup_complete() {
            continue;
        }

        let frame = match camera.capture_jpeg(Orientation::Horizontal).await {
            Ok(frame) if !frame.is_empty() => frame,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Camera capture failed");
                continue;
            }
        };

        match client.send_realtime_input(vec![Blob::jpeg(&frame)]).await {
            Ok(()) => {
                sent += 1;
                tracing::trace!(bytes = frame.len(), sent, "Camera frame sent");
            }
            Err(e) => tracing::debug!(error = %e, "Camera frame not sent"),
        }
    }
    tracing::debug!(sent, "Frame pump stopped");
}
