//! Music player: one lazily opened music session feeding a stereo scheduler.

use crate::error::{MusicError, Result};
use crate::prompts::{DEFAULT_PROMPT_MODEL, MusicPromptWriter, WeightedPrompt};
use crate::session::{BoxedMusicConnection, MusicMessage, MusicTransport, PlaybackControl};
use mirror_audio::{PcmFormat, PlaybackScheduler, SharedOutput};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Prompt used by [`MusicPlayer::toggle`] when none is given.
pub const DEFAULT_TOGGLE_PROMPT: &str = "Piano";

/// Player settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicPlayerConfig {
    /// Music model.
    pub model: String,
    /// Model used by the prompt writer.
    pub prompt_model: String,
}

impl Default for MusicPlayerConfig {
    fn default() -> Self {
        Self {
            model: "models/lyria-realtime-exp".to_string(),
            prompt_model: DEFAULT_PROMPT_MODEL.to_string(),
        }
    }
}

struct ActiveSession {
    connection: BoxedMusicConnection,
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct PlayerState {
    session: Option<ActiveSession>,
    playing: bool,
    generation: u64,
}

struct PlayerInner {
    transport: Arc<dyn MusicTransport>,
    scheduler: PlaybackScheduler,
    writer: Option<Arc<dyn MusicPromptWriter>>,
    config: MusicPlayerConfig,
    state: Mutex<PlayerState>,
    connect_lock: tokio::sync::Mutex<()>,
}

/// Streams generated music to an audio output.
///
/// Cheap to clone; clones share the session and the playback timeline.
///
/// # Example
///
/// ```rust,ignore
/// let player = MusicPlayer::new(Arc::new(LyriaTransport::from_env()?), output);
/// player.play(vec![WeightedPrompt::new("Piano"), WeightedPrompt::new("Rain").with_weight(0.5)]).await?;
/// player.set_volume(0.3)?;
/// player.stop().await?;
/// ```
#[derive(Clone)]
pub struct MusicPlayer {
    inner: Arc<PlayerInner>,
}

impl MusicPlayer {
    /// Create a player with default settings and no prompt writer.
    pub fn new(transport: Arc<dyn MusicTransport>, output: SharedOutput) -> Self {
        Self::with_config(transport, output, MusicPlayerConfig::default(), None)
    }

    /// Create a player.
    pub fn with_config(
        transport: Arc<dyn MusicTransport>,
        output: SharedOutput,
        config: MusicPlayerConfig,
        writer: Option<Arc<dyn MusicPromptWriter>>,
    ) -> Self {
        Self {
            inner: Arc::new(PlayerInner {
                transport,
                scheduler: PlaybackScheduler::new(output, PcmFormat::stereo_44khz()),
                writer,
                config,
                state: Mutex::new(PlayerState::default()),
                connect_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Whether music is playing.
    pub fn is_playing(&self) -> bool {
        self.inner.state.lock().playing
    }

    /// Whether a music session is open.
    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().session.is_some()
    }

    /// The playback scheduler.
    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.inner.scheduler
    }

    /// Set the music volume, 0.0 to 1.0 (default 0.5).
    pub fn set_volume(&self, level: f32) -> Result<()> {
        self.inner.scheduler.set_volume(level)?;
        tracing::debug!(level, "Music volume set");
        Ok(())
    }

    /// Current music volume.
    pub fn volume(&self) -> f32 {
        self.inner.scheduler.volume()
    }

    /// Steer the music with `prompts`, connecting first if needed, and start
    /// playback if it is not running.
    pub async fn play(&self, prompts: Vec<WeightedPrompt>) -> Result<()> {
        let connection = self.ensure_session().await?;
        connection.set_weighted_prompts(&prompts).await?;
        tracing::info!(prompts = ?prompts, "Music prompts set");

        let start = {
            let mut state = self.inner.state.lock();
            let start = !state.playing;
            state.playing = true;
            start
        };
        if start {
            self.inner.scheduler.start();
            if let Err(e) = connection.control(PlaybackControl::Play).await {
                self.inner.state.lock().playing = false;
                self.inner.scheduler.stop();
                return Err(e);
            }
            tracing::info!("Music playback started");
        }
        Ok(())
    }

    /// Play music for a free-form request.
    ///
    /// With a prompt writer the request is expanded into weighted prompts
    /// (an empty expansion is logged and ignored); without one the request
    /// itself is the single prompt.
    pub async fn play_request(&self, request: &str) -> Result<()> {
        self.play_request_with_model(request, None).await
    }

    /// Like [`play_request`](Self::play_request) with an explicit prompt model.
    pub async fn play_request_with_model(&self, request: &str, model: Option<&str>) -> Result<()> {
        let prompts = match &self.inner.writer {
            Some(writer) => {
                let model = model.unwrap_or(&self.inner.config.prompt_model);
                tracing::info!(%request, %model, "Generating music prompts");
                writer.write_prompts(request, model).await?
            }
            None => vec![WeightedPrompt::new(request)],
        };

        if prompts.is_empty() {
            tracing::warn!(%request, "No music prompts generated");
            return Ok(());
        }
        self.play(prompts).await
    }

    /// Pause generation and silence what is queued.
    pub async fn pause(&self) -> Result<()> {
        let connection = self.current_connection();
        self.inner.state.lock().playing = false;
        self.inner.scheduler.stop();
        match connection {
            Some(connection) => connection.control(PlaybackControl::Pause).await,
            None => Ok(()),
        }
    }

    /// Stop playback and reset the timeline. The session stays open.
    pub async fn stop(&self) -> Result<()> {
        let connection = self.current_connection();
        self.inner.state.lock().playing = false;
        self.inner.scheduler.stop();
        tracing::info!("Music playback stopped");
        match connection {
            Some(connection) => connection.control(PlaybackControl::Stop).await,
            None => Ok(()),
        }
    }

    /// Stop if playing, otherwise play `prompt` (default "Piano").
    pub async fn toggle(&self, prompt: Option<&str>) -> Result<()> {
        if self.is_playing() {
            self.stop().await
        } else {
            self.play_request(prompt.unwrap_or(DEFAULT_TOGGLE_PROMPT)).await
        }
    }

    /// Close the session. Idempotent.
    pub async fn disconnect(&self) -> Result<()> {
        let session = {
            let mut state = self.inner.state.lock();
            state.playing = false;
            state.generation += 1;
            state.session.take()
        };
        self.inner.scheduler.stop();
        if let Some(session) = session {
            session.cancel.cancel();
            session.connection.close().await?;
            tracing::info!(session_id = session.connection.session_id(), "Music session closed");
        }
        Ok(())
    }

    fn current_connection(&self) -> Option<BoxedMusicConnection> {
        self.inner.state.lock().session.as_ref().map(|s| s.connection.clone())
    }

    async fn ensure_session(&self) -> Result<BoxedMusicConnection> {
        let _guard = self.inner.connect_lock.lock().await;
        if let Some(connection) = self.current_connection() {
            return Ok(connection);
        }

        let span = mirror_telemetry::music_session_span(&self.inner.config.model);
        let connection = self
            .inner
            .transport
            .connect(&self.inner.config.model)
            .instrument(span.clone())
            .await
            .map_err(|e| match e {
                MusicError::ConnectionError(_) => e,
                other => MusicError::connection(other.to_string()),
            })?;

        let cancel = CancellationToken::new();
        let generation = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            let generation = state.generation;
            state.session =
                Some(ActiveSession { connection: connection.clone(), generation, cancel: cancel.clone() });
            generation
        };

        let inner = self.inner.clone();
        tokio::spawn(
            run_reader(inner, connection.clone(), generation, cancel).instrument(span),
        );
        Ok(connection)
    }
}

impl std::fmt::Debug for MusicPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("MusicPlayer")
            .field("model", &self.inner.config.model)
            .field("connected", &state.session.is_some())
            .field("playing", &state.playing)
            .finish()
    }
}

impl PlayerInner {
    /// Drop the session if it is still `generation`.
    fn clear_session(&self, generation: u64) {
        let cleared = {
            let mut state = self.state.lock();
            let current = state.session.as_ref().is_some_and(|s| s.generation == generation);
            if current {
                state.session = None;
                state.playing = false;
            }
            current
        };
        if cleared {
            self.scheduler.stop();
        }
    }
}

async fn run_reader(
    inner: Arc<PlayerInner>,
    connection: BoxedMusicConnection,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = connection.next_message() => next,
        };

        match next {
            Some(Ok(MusicMessage::AudioChunk(pcm))) => {
                if let Err(e) = inner.scheduler.submit(&pcm) {
                    tracing::warn!(error = %e, "Dropping music chunk");
                }
            }
            Some(Ok(MusicMessage::FilteredPrompt { text, reason })) => {
                tracing::warn!(%text, %reason, "Music prompt filtered");
            }
            Some(Ok(MusicMessage::SetupComplete)) => tracing::debug!("Music setup complete"),
            Some(Ok(MusicMessage::Unknown)) => {}
            Some(Err(e)) if e.is_fatal() => {
                tracing::error!(error = %e, "Music session error");
                inner.clear_session(generation);
                return;
            }
            Some(Err(e)) => tracing::warn!(error = %e, "Music message error"),
            None => {
                tracing::info!("Music session closed by server");
                inner.clear_session(generation);
                return;
            }
        }
    }
}
