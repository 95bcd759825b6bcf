//! Tool handler behaviour with fake image, camera and music collaborators.

mod common;

use common::{FakeCamera, FakeImageClient, wait_until};
use mirror_audio::testing::ManualOutput;
use mirror_avatar::tools::{self, story_prompt};
use mirror_avatar::{AppConfig, ImageBoard, Orientation, ToolContext, avatar_tools};
use mirror_music::mock::{MockMusicTransport, MusicCommand};
use mirror_music::{MusicPlayer, PlaybackControl, WeightedPrompt};
use mirror_realtime::{
    Blob, FunctionCall, FunctionDeclaration, Part, Scheduling, ToolRegistry,
};
use serde_json::json;
use std::sync::Arc;

struct Fixture {
    board: Arc<ImageBoard>,
    images: Arc<FakeImageClient>,
    camera: Arc<FakeCamera>,
    music: Arc<MockMusicTransport>,
    registry: ToolRegistry,
}

fn fixture_with(config: AppConfig, images: FakeImageClient) -> Fixture {
    let board = Arc::new(ImageBoard::new());
    let images = Arc::new(images);
    let camera = Arc::new(FakeCamera::default());
    let music = Arc::new(MockMusicTransport::new());
    let player = MusicPlayer::new(music.clone(), Arc::new(ManualOutput::new()));

    let ctx = ToolContext::new(Arc::new(config), board.clone())
        .with_image_client(images.clone())
        .with_camera(camera.clone())
        .with_music(player);
    Fixture { board, images, camera, music, registry: avatar_tools(Arc::new(ctx)) }
}

fn fixture() -> Fixture {
    let config = AppConfig {
        image_edit_model: "image-model".into(),
        disguise_prompt_template: "Disguise as ${disguise_character}".into(),
        edit_image_prompt_template: "Edit: ${prompt}".into(),
        ..Default::default()
    };
    fixture_with(config, FakeImageClient::new())
}

fn call(name: &str, args: serde_json::Value) -> FunctionCall {
    FunctionCall::new("call-1", name, args)
}

#[tokio::test]
async fn test_registry_covers_configured_tools() {
    let f = fixture();
    assert_eq!(f.registry.len(), 6);
    for name in [
        tools::DISGUISE_CAMERA_IMAGE,
        tools::EDIT_IMAGE,
        tools::CLEAR_IMAGE,
        tools::GENERATE_STORY_IMAGE,
        tools::PLAY_MUSIC,
        tools::STOP_MUSIC,
    ] {
        assert!(f.registry.contains(name), "missing {}", name);
    }
}

#[tokio::test]
async fn test_unhandled_configured_tool_is_not_offered() {
    let mut config = AppConfig::default();
    config.tools.insert("print".into(), FunctionDeclaration::new("print"));
    let f = fixture_with(config, FakeImageClient::new());

    assert!(!f.registry.contains("print"));
    assert_eq!(f.registry.declarations().len(), 6);
}

#[tokio::test]
async fn test_disguise_creates_chat_and_interrupts() {
    let f = fixture();

    let response = f
        .registry
        .dispatch(&call(tools::DISGUISE_CAMERA_IMAGE, json!({ "disguise_character": "a pirate" })))
        .await;

    assert!(!response.is_error(), "{:?}", response);
    assert_eq!(response.scheduling(), Scheduling::Interrupt);
    assert_eq!(f.camera.captures.lock().as_slice(), &[Orientation::Horizontal]);

    assert_eq!(f.images.chat_count(), 1);
    let chat = f.images.chat(0);
    assert_eq!(chat.model, "image-model");
    assert_eq!(
        chat.turns.lock()[0],
        vec![Part::inline(Blob::jpeg(b"jpeg")), Part::text("Disguise as a pirate")]
    );

    let url = "data:image/png;base64,cG5n";
    assert_eq!(f.board.disguised().as_deref(), Some(url));
    assert_eq!(f.board.last_edited().as_deref(), Some(url));
    assert!(f.board.image_chat().is_some());
}

#[tokio::test]
async fn test_disguise_uses_vertical_orientation() {
    let config = AppConfig {
        camera: mirror_avatar::CameraSettings { orientation: Orientation::Vertical },
        ..Default::default()
    };
    let f = fixture_with(config, FakeImageClient::new());

    f.registry
        .dispatch(&call(tools::DISGUISE_CAMERA_IMAGE, json!({ "disguise_character": "a cat" })))
        .await;

    assert_eq!(f.camera.captures.lock().as_slice(), &[Orientation::Vertical]);
}

#[tokio::test]
async fn test_edit_requires_chat() {
    let f = fixture();

    let response = f.registry.dispatch(&call(tools::EDIT_IMAGE, json!({ "prompt": "add a hat" }))).await;

    assert!(response.is_error());
    assert_eq!(response.error_message(), Some("No image chat available."));
    assert_eq!(response.scheduling(), Scheduling::WhenIdle);
}

#[tokio::test]
async fn test_edit_continues_disguise_chat() {
    let f = fixture();
    f.registry
        .dispatch(&call(tools::DISGUISE_CAMERA_IMAGE, json!({ "disguise_character": "a pirate" })))
        .await;

    let response = f.registry.dispatch(&call(tools::EDIT_IMAGE, json!({ "prompt": "add a hat" }))).await;

    assert!(!response.is_error(), "{:?}", response);
    assert_eq!(response.scheduling(), Scheduling::Interrupt);
    assert_eq!(f.images.chat_count(), 1);
    assert_eq!(f.images.chat(0).turns.lock()[1], vec![Part::text("Edit: add a hat")]);
    assert!(f.board.last_edited().is_some());
}

#[tokio::test]
async fn test_story_chat_is_created_once() {
    let f = fixture();

    for prompt in ["a dragon wakes up", "the dragon flies away"] {
        let response =
            f.registry.dispatch(&call(tools::GENERATE_STORY_IMAGE, json!({ "prompt": prompt }))).await;
        assert!(!response.is_error(), "{:?}", response);
        assert_eq!(response.scheduling(), Scheduling::Silent);
    }

    assert_eq!(f.images.chat_count(), 1);
    let turns = f.images.chat(0).turns.lock().clone();
    assert_eq!(turns[1], vec![Part::text(story_prompt("the dragon flies away"))]);
    assert!(f.board.story().is_some());
    assert!(f.board.image_chat().is_none());
}

#[tokio::test]
async fn test_story_requires_prompt() {
    let f = fixture();

    let response = f.registry.dispatch(&call(tools::GENERATE_STORY_IMAGE, json!({}))).await;

    assert_eq!(
        response.error_message(),
        Some("The 'prompt' argument is missing or invalid for generate_story_image tool call.")
    );
    assert_eq!(f.images.chat_count(), 0);
}

#[tokio::test]
async fn test_missing_image_client() {
    let board = Arc::new(ImageBoard::new());
    let registry = avatar_tools(Arc::new(ToolContext::new(Arc::new(AppConfig::default()), board)));

    for (name, args) in [
        (tools::DISGUISE_CAMERA_IMAGE, json!({ "disguise_character": "a knight" })),
        (tools::GENERATE_STORY_IMAGE, json!({ "prompt": "a castle" })),
    ] {
        let response = registry.dispatch(&call(name, args)).await;
        assert_eq!(response.error_message(), Some("AI client not initialized."), "{}", name);
    }
}

#[tokio::test]
async fn test_reply_without_image() {
    let f = fixture_with(AppConfig::default(), FakeImageClient::text_only());

    let response =
        f.registry.dispatch(&call(tools::GENERATE_STORY_IMAGE, json!({ "prompt": "a castle" }))).await;

    assert_eq!(response.error_message(), Some("No image data in response"));
    assert!(f.board.story().is_none());
}

#[tokio::test]
async fn test_clear_image_resets_board() {
    let f = fixture();
    f.registry
        .dispatch(&call(tools::DISGUISE_CAMERA_IMAGE, json!({ "disguise_character": "a pirate" })))
        .await;
    f.registry.dispatch(&call(tools::GENERATE_STORY_IMAGE, json!({ "prompt": "a ship" }))).await;

    let response = f.registry.dispatch(&call(tools::CLEAR_IMAGE, json!({}))).await;

    assert!(!response.is_error());
    assert_eq!(response.scheduling(), Scheduling::WhenIdle);
    assert_eq!(f.board.displayed(), None);
    assert!(f.board.image_chat().is_none());
    assert!(f.board.story_chat().is_none());
}

#[tokio::test]
async fn test_play_music_is_fire_and_forget() {
    let f = fixture();

    let response =
        f.registry.dispatch(&call(tools::PLAY_MUSIC, json!({ "prompt": "sea shanty" }))).await;
    assert!(!response.is_error());
    assert_eq!(response.scheduling(), Scheduling::Silent);

    wait_until(|| {
        f.music.last_connection().is_some_and(|c| {
            c.commands().contains(&MusicCommand::Control(PlaybackControl::Play))
        })
    })
    .await;
    assert_eq!(
        f.music.last_connection().unwrap().commands()[0],
        MusicCommand::Prompts(vec![WeightedPrompt::new("sea shanty")])
    );
}

#[tokio::test]
async fn test_stop_music() {
    let f = fixture();
    f.registry.dispatch(&call(tools::PLAY_MUSIC, json!({ "prompt": "waltz" }))).await;
    wait_until(|| f.music.connect_count() == 1).await;
    wait_until(|| f.music.last_connection().is_some_and(|c| c.commands().len() == 2)).await;

    let response = f.registry.dispatch(&call(tools::STOP_MUSIC, json!({}))).await;

    assert!(!response.is_error());
    assert_eq!(response.scheduling(), Scheduling::WhenIdle);
    assert_eq!(
        f.music.last_connection().unwrap().commands().last(),
        Some(&MusicCommand::Control(PlaybackControl::Stop))
    );
}

#[tokio::test]
async fn test_disguise_accompaniment() {
    let mut config = AppConfig {
        disguise_music_prompt_template: "Theme for ${disguise_character}".into(),
        ..Default::default()
    };
    config.music.accompany = true;
    let f = fixture_with(config, FakeImageClient::new());

    f.registry
        .dispatch(&call(tools::DISGUISE_CAMERA_IMAGE, json!({ "disguise_character": "a wizard" })))
        .await;

    wait_until(|| f.music.last_connection().is_some_and(|c| !c.commands().is_empty())).await;
    assert_eq!(
        f.music.last_connection().unwrap().commands()[0],
        MusicCommand::Prompts(vec![WeightedPrompt::new("Theme for a wizard")])
    );
}

#[tokio::test]
async fn test_no_accompaniment_by_default() {
    let f = fixture();
    f.registry
        .dispatch(&call(tools::DISGUISE_CAMERA_IMAGE, json!({ "disguise_character": "a wizard" })))
        .await;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(f.music.connect_count(), 0);
}
