//! Fakes shared by the avatar integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use mirror_avatar::{CameraSource, ImageChat, ImageClient, Orientation, SharedChat};
use mirror_realtime::{Blob, Part};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Chat that records every turn and answers with a fixed reply.
pub struct FakeChat {
    pub model: String,
    pub turns: Mutex<Vec<Vec<Part>>>,
    reply: Vec<Part>,
}

#[async_trait]
impl ImageChat for FakeChat {
    async fn send_message(&self, parts: Vec<Part>) -> mirror_avatar::Result<Vec<Part>> {
        self.turns.lock().push(parts);
        Ok(self.reply.clone())
    }
}

/// Image client handing out [`FakeChat`]s.
#[derive(Default)]
pub struct FakeImageClient {
    pub chats: Mutex<Vec<Arc<FakeChat>>>,
    text_only: bool,
}

impl FakeImageClient {
    /// Chats reply with a PNG.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chats reply with text and no image.
    pub fn text_only() -> Self {
        Self { text_only: true, ..Default::default() }
    }

    pub fn chat_count(&self) -> usize {
        self.chats.lock().len()
    }

    pub fn chat(&self, index: usize) -> Arc<FakeChat> {
        self.chats.lock()[index].clone()
    }
}

#[async_trait]
impl ImageClient for FakeImageClient {
    async fn create_chat(&self, model: &str) -> mirror_avatar::Result<SharedChat> {
        let reply = if self.text_only {
            vec![Part::text("I cannot draw that")]
        } else {
            vec![Part::text("Here it is"), Part::inline(Blob::new("image/png", b"png"))]
        };
        let chat =
            Arc::new(FakeChat { model: model.to_string(), turns: Mutex::new(Vec::new()), reply });
        self.chats.lock().push(chat.clone());
        Ok(chat)
    }
}

/// Camera returning the same frame every time.
#[derive(Default)]
pub struct FakeCamera {
    pub captures: Mutex<Vec<Orientation>>,
}

#[async_trait]
impl CameraSource for FakeCamera {
    async fn capture_jpeg(&self, orientation: Orientation) -> mirror_avatar::Result<Vec<u8>> {
        self.captures.lock().push(orientation);
        Ok(b"jpeg".to_vec())
    }
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached");
}
