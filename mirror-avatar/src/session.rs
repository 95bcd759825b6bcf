//! The avatar session: one live conversation wired to speech playback, the
//! image board, the camera and music.

use crate::camera::{FramePump, SharedCamera};
use crate::config::AppConfig;
use crate::error::Result;
use crate::images::{ImageBoard, ImageClient};
use crate::playback::SpeechPlayback;
use crate::tools::{ToolContext, avatar_tools};
use mirror_audio::SharedOutput;
use mirror_music::MusicPlayer;
use mirror_realtime::{BoxedTransport, LiveClient, LiveConfig, SubscriptionId, TracingListener};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Builds an [`AvatarSession`].
pub struct AvatarSessionBuilder {
    config: AppConfig,
    transport: BoxedTransport,
    speech_output: SharedOutput,
    music: Option<MusicPlayer>,
    image_client: Option<Arc<dyn ImageClient>>,
    camera: Option<SharedCamera>,
}

impl AvatarSessionBuilder {
    pub fn with_music(mut self, player: MusicPlayer) -> Self {
        self.music = Some(player);
        self
    }

    pub fn with_image_client(mut self, client: Arc<dyn ImageClient>) -> Self {
        self.image_client = Some(client);
        self
    }

    pub fn with_camera(mut self, camera: SharedCamera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn build(self) -> AvatarSession {
        let config = Arc::new(self.config);
        let board = Arc::new(ImageBoard::new());

        let mut ctx = ToolContext::new(config.clone(), board.clone());
        ctx.image_client = self.image_client;
        ctx.camera = self.camera.clone();
        ctx.music = self.music.clone();
        let tools = avatar_tools(Arc::new(ctx));

        let client = LiveClient::with_tools(self.transport, tools);
        let playback = Arc::new(SpeechPlayback::new(
            self.speech_output,
            Duration::from_millis(config.end_of_speech_grace_period_ms),
        ));
        let subscriptions = vec![
            client.subscribe(Arc::new(TracingListener)),
            client.subscribe(playback.clone()),
        ];

        AvatarSession {
            config,
            client,
            board,
            playback,
            music: self.music,
            camera: self.camera,
            pump: Mutex::new(None),
            subscriptions,
        }
    }
}

/// A magic mirror conversation.
///
/// ```rust,ignore
/// let session = AvatarSession::builder(config, Arc::new(GeminiLiveTransport::from_env()?), speech_output)
///     .with_music(player)
///     .build();
/// session.connect().await?;
/// session.client().send_text("Mirror, mirror on the wall").await?;
/// ```
pub struct AvatarSession {
    config: Arc<AppConfig>,
    client: LiveClient,
    board: Arc<ImageBoard>,
    playback: Arc<SpeechPlayback>,
    music: Option<MusicPlayer>,
    camera: Option<SharedCamera>,
    pump: Mutex<Option<FramePump>>,
    subscriptions: Vec<SubscriptionId>,
}

impl AvatarSession {
    pub fn builder(
        config: AppConfig,
        transport: BoxedTransport,
        speech_output: SharedOutput,
    ) -> AvatarSessionBuilder {
        AvatarSessionBuilder {
            config,
            transport,
            speech_output,
            music: None,
            image_client: None,
            camera: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn client(&self) -> &LiveClient {
        &self.client
    }

    pub fn board(&self) -> &ImageBoard {
        &self.board
    }

    pub fn playback(&self) -> &SpeechPlayback {
        &self.playback
    }

    pub fn music(&self) -> Option<&MusicPlayer> {
        self.music.as_ref()
    }

    /// Whether the avatar is speaking (within the end-of-speech grace period).
    pub fn is_talking(&self) -> bool {
        self.playback.is_talking()
    }

    /// Session config sent at connect: the app config with the functions
    /// that actually have handlers.
    pub fn live_config(&self) -> LiveConfig {
        let mut config = self.config.live_config();
        if let Some(tools) = self.client.tools() {
            config.functions = tools.declarations().to_vec();
        }
        config
    }

    /// Open the conversation, replacing any previous one. Starts the camera
    /// when auto-start asks for it.
    pub async fn connect(&self) -> Result<()> {
        let model = &self.config.live_model;
        tracing::info!(%model, language = %self.config.language_code, "Connecting avatar");
        self.client.connect(model, self.live_config()).await?;
        if self.config.auto_start.with_camera {
            self.start_camera();
        }
        Ok(())
    }

    /// Connect at launch when `autoStart.enabled` is set. Returns whether a
    /// conversation was opened.
    pub async fn auto_start(&self) -> Result<bool> {
        if !self.config.auto_start.enabled {
            tracing::debug!("Auto-start disabled; waiting for the first message");
            return Ok(false);
        }
        self.connect().await?;
        Ok(true)
    }

    /// Connect unless a conversation is already open.
    pub async fn ensure_connected(&self) -> Result<()> {
        if self.client.is_connected() {
            return Ok(());
        }
        self.connect().await
    }

    /// Close the conversation and stop the music.
    pub async fn disconnect(&self) -> Result<()> {
        self.stop_camera().await;
        self.client.disconnect().await?;
        if let Some(music) = &self.music {
            music.stop().await?;
        }
        tracing::info!("Avatar disconnected");
        Ok(())
    }

    /// Disconnect, then connect again.
    pub async fn restart(&self) -> Result<()> {
        self.disconnect().await?;
        self.connect().await
    }

    /// Start streaming camera frames. Returns false without a camera.
    pub fn start_camera(&self) -> bool {
        let Some(camera) = &self.camera else {
            tracing::warn!("No camera attached");
            return false;
        };
        let mut pump = self.pump.lock();
        if pump.as_ref().is_none_or(|p| !p.is_running()) {
            *pump = Some(FramePump::start(self.client.clone(), camera.clone()));
            tracing::info!("Camera streaming started");
        }
        true
    }

    pub async fn stop_camera(&self) {
        let pump = self.pump.lock().take();
        if let Some(pump) = pump {
            pump.stop().await;
            tracing::info!("Camera streaming stopped");
        }
    }

    pub fn is_camera_streaming(&self) -> bool {
        self.pump.lock().as_ref().is_some_and(FramePump::is_running)
    }
}

impl Drop for AvatarSession {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.client.unsubscribe(id);
        }
    }
}

impl std::fmt::Debug for AvatarSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarSession")
            .field("client", &self.client)
            .field("board", &self.board)
            .field("playback", &self.playback)
            .finish_non_exhaustive()
    }
}
