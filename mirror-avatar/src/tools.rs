//! The avatar's tools: disguises, image edits, story illustrations and music.
//!
//! Image tools answer with `INTERRUPT` so the avatar reacts to the new
//! picture right away; story images and music answer `SILENT` so the story
//! keeps flowing.

use crate::camera::SharedCamera;
use crate::config::AppConfig;
use crate::error::{AvatarError, Result};
use crate::images::{ImageBoard, ImageClient, send_for_image};
use async_trait::async_trait;
use mirror_music::MusicPlayer;
use mirror_realtime::{
    Blob, FunctionCall, Part, Scheduling, ToolExecutionError, ToolHandler, ToolOutcome,
    ToolRegistry, ToolResult,
};
use std::sync::Arc;
use tracing::Instrument;

pub const DISGUISE_CAMERA_IMAGE: &str = "disguise_camera_image";
pub const EDIT_IMAGE: &str = "edit_image";
pub const CLEAR_IMAGE: &str = "clearImage";
pub const GENERATE_STORY_IMAGE: &str = "generate_story_image";
pub const PLAY_MUSIC: &str = "play_music";
pub const STOP_MUSIC: &str = "stop_music";

/// Turn a story beat into an image request.
pub fn story_prompt(prompt: &str) -> String {
    format!(
        "Generate a fantasy-style image based on the following description: {}. Maintain a \
         consistent art style with any previous images in this conversation.",
        prompt
    )
}

/// Everything the tools act on.
#[derive(Clone)]
pub struct ToolContext {
    pub config: Arc<AppConfig>,
    pub board: Arc<ImageBoard>,
    pub image_client: Option<Arc<dyn ImageClient>>,
    pub camera: Option<SharedCamera>,
    pub music: Option<MusicPlayer>,
}

impl ToolContext {
    /// A context with no collaborators attached.
    pub fn new(config: Arc<AppConfig>, board: Arc<ImageBoard>) -> Self {
        Self { config, board, image_client: None, camera: None, music: None }
    }

    pub fn with_image_client(mut self, client: Arc<dyn ImageClient>) -> Self {
        self.image_client = Some(client);
        self
    }

    pub fn with_camera(mut self, camera: SharedCamera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_music(mut self, music: MusicPlayer) -> Self {
        self.music = Some(music);
        self
    }

    fn image_client(&self) -> Result<&Arc<dyn ImageClient>> {
        self.image_client.as_ref().ok_or_else(|| AvatarError::image("AI client not initialized."))
    }

    /// Start music for `request` in the background.
    fn spawn_music(&self, request: String, model: Option<String>) {
        let Some(player) = self.music.clone() else {
            tracing::warn!(%request, "No music player attached");
            return;
        };
        let span = tracing::info_span!("music.request", %request);
        tokio::spawn(
            async move {
                if let Err(e) = player.play_request_with_model(&request, model.as_deref()).await {
                    tracing::warn!(error = %e, "Music request failed");
                }
            }
            .instrument(span),
        );
    }

    /// Music accompaniment for image tools, when enabled.
    fn accompany(&self, request: String) {
        if self.config.music.accompany {
            self.spawn_music(request, None);
        }
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("board", &self.board)
            .field("image_client", &self.image_client.is_some())
            .field("camera", &self.camera.is_some())
            .field("music", &self.music.is_some())
            .finish_non_exhaustive()
    }
}

fn required_arg<'a>(call: &'a FunctionCall, key: &str) -> std::result::Result<&'a str, ToolExecutionError> {
    call.arg_str(key).filter(|v| !v.is_empty()).ok_or_else(|| {
        ToolExecutionError::new(format!(
            "The '{}' argument is missing or invalid for {} tool call.",
            key, call.name
        ))
    })
}

/// Photographs the visitor and redraws them as a character.
pub struct DisguiseCameraImage {
    ctx: Arc<ToolContext>,
}

impl DisguiseCameraImage {
    async fn run(&self, character: &str) -> Result<String> {
        let ctx = &self.ctx;
        let client = ctx.image_client()?;
        ctx.accompany(ctx.config.disguise_music_prompt(character));

        let camera = ctx.camera.as_ref().ok_or_else(|| AvatarError::camera("No camera attached"))?;
        let frame = camera.capture_jpeg(ctx.config.camera.orientation).await?;
        tracing::debug!(bytes = frame.len(), "Captured disguise frame");

        let chat = client.create_chat(&ctx.config.image_edit_model).await?;
        ctx.board.set_image_chat(chat.clone());

        let parts =
            vec![Part::inline(Blob::jpeg(&frame)), Part::text(ctx.config.disguise_prompt(character))];
        let url = send_for_image(chat.as_ref(), parts).await?;
        ctx.board.set_disguised(url.clone());
        Ok(url)
    }
}

#[async_trait]
impl ToolHandler for DisguiseCameraImage {
    async fn call(&self, call: &FunctionCall) -> ToolResult {
        let character = required_arg(call, "disguise_character")?;
        self.run(character).await?;
        tracing::info!(%character, "Visitor disguised");
        Ok(ToolOutcome::ok().with_scheduling(Scheduling::Interrupt))
    }
}

/// Refines the current disguise.
pub struct EditImage {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for EditImage {
    async fn call(&self, call: &FunctionCall) -> ToolResult {
        let ctx = &self.ctx;
        let chat = ctx.board.image_chat().ok_or("No image chat available.")?;
        let prompt = required_arg(call, "prompt")?;
        ctx.accompany(ctx.config.edit_image_music_prompt(prompt));

        let url = send_for_image(chat.as_ref(), vec![Part::text(ctx.config.edit_image_prompt(prompt))])
            .await?;
        ctx.board.set_edited(url);
        tracing::info!(%prompt, "Image edited");
        Ok(ToolOutcome::ok().with_scheduling(Scheduling::Interrupt))
    }
}

/// Removes every image and forgets both chats.
pub struct ClearImage {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for ClearImage {
    async fn call(&self, _call: &FunctionCall) -> ToolResult {
        self.ctx.board.clear();
        Ok(ToolOutcome::ok())
    }
}

/// Illustrates a story in a consistent style.
pub struct GenerateStoryImage {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for GenerateStoryImage {
    async fn call(&self, call: &FunctionCall) -> ToolResult {
        let ctx = &self.ctx;
        let client = ctx.image_client()?;
        let prompt = required_arg(call, "prompt")?;
        ctx.accompany(prompt.to_string());

        let chat = match ctx.board.story_chat() {
            Some(chat) => chat,
            None => {
                tracing::debug!("Starting story chat");
                let chat = client.create_chat(&ctx.config.image_edit_model).await?;
                ctx.board.set_story_chat(chat.clone());
                chat
            }
        };

        let url = send_for_image(chat.as_ref(), vec![Part::text(story_prompt(prompt))]).await?;
        ctx.board.set_story(url);
        Ok(ToolOutcome::ok().with_scheduling(Scheduling::Silent))
    }
}

/// Starts music without waiting for it.
pub struct PlayMusic {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for PlayMusic {
    async fn call(&self, call: &FunctionCall) -> ToolResult {
        match call.arg_str("prompt") {
            Some(prompt) => {
                let model = call.arg_str("modelName").map(str::to_string);
                self.ctx.spawn_music(prompt.to_string(), model);
            }
            None => tracing::warn!("play_music called without a prompt"),
        }
        Ok(ToolOutcome::ok().with_scheduling(Scheduling::Silent))
    }
}

pub struct StopMusic {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for StopMusic {
    async fn call(&self, _call: &FunctionCall) -> ToolResult {
        if let Some(player) = &self.ctx.music {
            player.stop().await.map_err(|e| ToolExecutionError::new(e.to_string()))?;
        }
        Ok(ToolOutcome::ok())
    }
}

/// Handler for a known tool name.
pub fn handler_for(name: &str, ctx: &Arc<ToolContext>) -> Option<Arc<dyn ToolHandler>> {
    let ctx = ctx.clone();
    let handler: Arc<dyn ToolHandler> = match name {
        DISGUISE_CAMERA_IMAGE => Arc::new(DisguiseCameraImage { ctx }),
        EDIT_IMAGE => Arc::new(EditImage { ctx }),
        CLEAR_IMAGE => Arc::new(ClearImage { ctx }),
        GENERATE_STORY_IMAGE => Arc::new(GenerateStoryImage { ctx }),
        PLAY_MUSIC => Arc::new(PlayMusic { ctx }),
        STOP_MUSIC => Arc::new(StopMusic { ctx }),
        _ => return None,
    };
    Some(handler)
}

/// Registry with a handler for every configured tool the avatar knows.
///
/// Configured tools without a handler are left out, so the model is never
/// offered a function nobody answers.
pub fn avatar_tools(ctx: Arc<ToolContext>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for declaration in ctx.config.function_declarations() {
        match handler_for(&declaration.name, &ctx) {
            Some(handler) => registry.register(declaration, handler),
            None => tracing::warn!(tool = %declaration.name, "No handler for configured tool"),
        }
    }
    registry
}
