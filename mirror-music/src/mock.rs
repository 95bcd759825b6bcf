//! In-memory music transport for tests.

use crate::error::{MusicError, Result};
use crate::prompts::WeightedPrompt;
use crate::session::{
    BoxedMusicConnection, MusicConnection, MusicMessage, MusicTransport, PlaybackControl,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// A command the player sent through a [`MockMusicConnection`].
#[derive(Debug, Clone, PartialEq)]
pub enum MusicCommand {
    Prompts(Vec<WeightedPrompt>),
    Control(PlaybackControl),
}

/// Scripted music transport.
#[derive(Default)]
pub struct MockMusicTransport {
    connections: Mutex<Vec<Arc<MockMusicConnection>>>,
    fail_next: Mutex<Option<String>>,
}

impl MockMusicTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `connect` fail with `message`.
    pub fn fail_next_connect(&self, message: impl Into<String>) {
        *self.fail_next.lock() = Some(message.into());
    }

    /// Number of sessions opened so far.
    pub fn connect_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// The most recent connection.
    pub fn last_connection(&self) -> Option<Arc<MockMusicConnection>> {
        self.connections.lock().last().cloned()
    }
}

#[async_trait]
impl MusicTransport for MockMusicTransport {
    async fn connect(&self, model: &str) -> Result<BoxedMusicConnection> {
        if let Some(message) = self.fail_next.lock().take() {
            return Err(MusicError::connection(message));
        }
        let connection = Arc::new(MockMusicConnection::new(model));
        self.connections.lock().push(connection.clone());
        Ok(connection)
    }
}

/// Scripted music connection.
pub struct MockMusicConnection {
    model: String,
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<Result<MusicMessage>>>>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<MusicMessage>>>,
    commands: Mutex<Vec<MusicCommand>>,
    closed: AtomicBool,
}

impl MockMusicConnection {
    fn new(model: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            model: model.to_string(),
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: tokio::sync::Mutex::new(rx),
            commands: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Model the session was opened for.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Deliver a PCM chunk.
    pub fn push_audio(&self, pcm: &[u8]) {
        self.push(Ok(MusicMessage::AudioChunk(Bytes::copy_from_slice(pcm))));
    }

    /// Deliver an arbitrary message or error.
    pub fn push(&self, message: Result<MusicMessage>) {
        if let Some(tx) = self.inbound_tx.lock().as_ref() {
            let _ = tx.send(message);
        }
    }

    /// Close the inbound stream as if the server hung up.
    pub fn end_stream(&self) {
        self.inbound_tx.lock().take();
    }

    /// Commands received so far.
    pub fn commands(&self) -> Vec<MusicCommand> {
        self.commands.lock().clone()
    }

    /// Whether the player closed this connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, command: MusicCommand) -> Result<()> {
        if self.is_closed() {
            return Err(MusicError::NotConnected);
        }
        self.commands.lock().push(command);
        Ok(())
    }
}

#[async_trait]
impl MusicConnection for MockMusicConnection {
    fn session_id(&self) -> &str {
        "mock-music"
    }

    async fn set_weighted_prompts(&self, prompts: &[WeightedPrompt]) -> Result<()> {
        self.record(MusicCommand::Prompts(prompts.to_vec()))
    }

    async fn control(&self, control: PlaybackControl) -> Result<()> {
        self.record(MusicCommand::Control(control))
    }

    async fn next_message(&self) -> Option<Result<MusicMessage>> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.end_stream();
        Ok(())
    }
}
