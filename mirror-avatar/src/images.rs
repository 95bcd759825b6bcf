//! Image chats and the board of images shown in the mirror.
//!
//! An image chat is a multi-turn conversation with an image model: each
//! turn may refine the image produced by the previous one. The board keeps
//! two of them, one for the visitor's disguise and one for story
//! illustrations, plus the images they produced.

use crate::error::{AvatarError, Result};
use async_trait::async_trait;
use mirror_realtime::Part;
use parking_lot::Mutex;
use std::sync::Arc;

/// A multi-turn conversation with an image model.
#[async_trait]
pub trait ImageChat: Send + Sync {
    /// Send one user turn and return the parts of the model's reply.
    async fn send_message(&self, parts: Vec<Part>) -> Result<Vec<Part>>;
}

/// Shared chat handle.
pub type SharedChat = Arc<dyn ImageChat>;

/// Creates image chats.
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// Start a fresh chat with `model`.
    async fn create_chat(&self, model: &str) -> Result<SharedChat>;
}

/// The first inline image of a reply, as a `data:` URL.
pub fn first_image(parts: &[Part]) -> Result<String> {
    parts
        .iter()
        .find_map(|part| part.inline_data.as_ref())
        .map(|blob| blob.to_data_url())
        .ok_or_else(|| AvatarError::image("No image data in response"))
}

/// Send `parts` on `chat` and extract the returned image.
pub async fn send_for_image(chat: &dyn ImageChat, parts: Vec<Part>) -> Result<String> {
    let reply = chat.send_message(parts).await?;
    first_image(&reply)
}

#[derive(Default)]
struct BoardState {
    disguised: Option<String>,
    story: Option<String>,
    last_edited: Option<String>,
    image_chat: Option<SharedChat>,
    story_chat: Option<SharedChat>,
}

/// Images currently shown and the chats that produced them.
#[derive(Default)]
pub struct ImageBoard {
    state: Mutex<BoardState>,
}

impl ImageBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The image to display: the last edit, else the story image, else the
    /// disguise.
    pub fn displayed(&self) -> Option<String> {
        let state = self.state.lock();
        state.last_edited.clone().or_else(|| state.story.clone()).or_else(|| state.disguised.clone())
    }

    pub fn disguised(&self) -> Option<String> {
        self.state.lock().disguised.clone()
    }

    pub fn story(&self) -> Option<String> {
        self.state.lock().story.clone()
    }

    pub fn last_edited(&self) -> Option<String> {
        self.state.lock().last_edited.clone()
    }

    /// Record a new disguise.
    pub fn set_disguised(&self, url: String) {
        let mut state = self.state.lock();
        state.last_edited = Some(url.clone());
        state.disguised = Some(url);
    }

    /// Record an edit of the disguise.
    pub fn set_edited(&self, url: String) {
        self.state.lock().last_edited = Some(url);
    }

    /// Record a story illustration.
    pub fn set_story(&self, url: String) {
        let mut state = self.state.lock();
        state.last_edited = Some(url.clone());
        state.story = Some(url);
    }

    /// Chat that produced the disguise, if any.
    pub fn image_chat(&self) -> Option<SharedChat> {
        self.state.lock().image_chat.clone()
    }

    pub fn set_image_chat(&self, chat: SharedChat) {
        self.state.lock().image_chat = Some(chat);
    }

    pub fn story_chat(&self) -> Option<SharedChat> {
        self.state.lock().story_chat.clone()
    }

    pub fn set_story_chat(&self, chat: SharedChat) {
        self.state.lock().story_chat = Some(chat);
    }

    /// Drop every image and both chats.
    pub fn clear(&self) {
        *self.state.lock() = BoardState::default();
        tracing::info!("Image board cleared");
    }

    /// Hide the displayed images but keep the chats.
    pub fn hide(&self) {
        let mut state = self.state.lock();
        state.disguised = None;
        state.last_edited = None;
    }
}

impl std::fmt::Debug for ImageBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ImageBoard")
            .field("disguised", &state.disguised.is_some())
            .field("story", &state.story.is_some())
            .field("last_edited", &state.last_edited.is_some())
            .field("image_chat", &state.image_chat.is_some())
            .field("story_chat", &state.story_chat.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_realtime::Blob;

    #[test]
    fn test_first_image_skips_text() {
        let parts = vec![Part::text("here you go"), Part::inline(Blob::new("image/png", b"png"))];
        assert_eq!(first_image(&parts).unwrap(), "data:image/png;base64,cG5n");
    }

    #[test]
    fn test_first_image_missing() {
        let err = first_image(&[Part::text("sorry")]).unwrap_err();
        assert_eq!(err.to_string(), "No image data in response");
    }

    #[test]
    fn test_display_priority() {
        let board = ImageBoard::new();
        assert_eq!(board.displayed(), None);

        board.set_disguised("a".into());
        assert_eq!(board.displayed().as_deref(), Some("a"));

        board.set_story("b".into());
        board.set_edited("c".into());
        assert_eq!(board.displayed().as_deref(), Some("c"));

        board.hide();
        assert_eq!(board.displayed().as_deref(), Some("b"));

        board.clear();
        assert_eq!(board.displayed(), None);
        assert_eq!(board.story(), None);
    }
}
