//! Lyria RealTime music streaming over WebSocket.

use crate::error::{MusicError, Result};
use crate::prompts::WeightedPrompt;
use crate::session::{
    BoxedMusicConnection, MusicConnection, MusicMessage, MusicTransport, PlaybackControl,
    parse_music_message,
};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite::Message};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures::stream::SplitSink<WsStream, Message>;
type WsSource = futures::stream::SplitStream<WsStream>;

/// Lyria WebSocket host (without version or key).
pub const LYRIA_HOST: &str = "wss://generativelanguage.googleapis.com/ws";

/// Default music model.
pub const LYRIA_MODEL: &str = "models/lyria-realtime-exp";

/// How long to wait for `setupComplete`.
pub const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens Lyria sessions with an API key.
#[derive(Clone)]
pub struct LyriaTransport {
    api_key: SecretString,
    api_version: String,
    host: String,
}

impl LyriaTransport {
    /// Create a transport for the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            api_version: "v1alpha".to_string(),
            host: LYRIA_HOST.to_string(),
        }
    }

    /// Read the API key from `GEMINI_API_KEY` or `GOOGLE_API_KEY`.
    pub fn from_env() -> Result<Self> {
        mirror_realtime::api_key_from_env()
            .map(Self::new)
            .ok_or_else(|| MusicError::config(mirror_realtime::auth::missing_api_key_message()))
    }

    /// Override the WebSocket host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub(crate) fn endpoint(&self) -> Result<url::Url> {
        let raw = format!(
            "{}/google.ai.generativelanguage.{}.GenerativeService.BidiGenerateMusic",
            self.host.trim_end_matches('/'),
            self.api_version
        );
        let mut url = url::Url::parse(&raw)
            .map_err(|e| MusicError::config(format!("Invalid music endpoint {}: {}", raw, e)))?;
        url.query_pairs_mut().append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }
}

#[async_trait]
impl MusicTransport for LyriaTransport {
    async fn connect(&self, model: &str) -> Result<BoxedMusicConnection> {
        let session = LyriaSession::connect(self.endpoint()?, model).await?;
        Ok(Arc::new(session))
    }
}

impl std::fmt::Debug for LyriaTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LyriaTransport")
            .field("api_version", &self.api_version)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// Lyria music session.
pub struct LyriaSession {
    session_id: String,
    connected: AtomicBool,
    sender: Mutex<WsSink>,
    receiver: Mutex<WsSource>,
    pending: parking_lot::Mutex<VecDeque<MusicMessage>>,
}

impl LyriaSession {
    /// Connect, send the setup for `model` and wait for `setupComplete`.
    pub async fn connect(endpoint: url::Url, model: &str) -> Result<Self> {
        mirror_realtime::ensure_crypto_provider();

        let request = endpoint.as_str().into_client_request().map_err(|e| {
            MusicError::connection(format!("Failed to create client request: {}", e))
        })?;
        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| MusicError::connection(format!("WebSocket connect error: {}", e)))?;
        let (sink, source) = stream.split();

        let session = Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            connected: AtomicBool::new(true),
            sender: Mutex::new(sink),
            receiver: Mutex::new(source),
            pending: parking_lot::Mutex::new(VecDeque::new()),
        };

        tracing::info!(model_id = %model, "Connecting to Lyria");
        session.send_raw(&json!({ "setup": { "model": model } })).await?;

        tokio::time::timeout(SETUP_TIMEOUT, session.await_setup())
            .await
            .map_err(|_| MusicError::connection("Timed out waiting for music setup"))??;

        tracing::info!(session_id = %session.session_id, "Lyria connection ready");
        Ok(session)
    }

    async fn await_setup(&self) -> Result<()> {
        loop {
            match self.next_message().await {
                Some(Ok(MusicMessage::SetupComplete)) => return Ok(()),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e),
                None => return Err(MusicError::connection("Closed before setup completed")),
            }
        }
    }

    async fn send_raw(&self, value: &Value) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(MusicError::NotConnected);
        }
        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Text(value.to_string().into()))
            .await
            .map_err(|e| MusicError::connection(format!("Send error: {}", e)))
    }

    fn enqueue(&self, raw: &str) -> Result<()> {
        let messages = parse_music_message(raw)?;
        self.pending.lock().extend(messages);
        Ok(())
    }
}

#[async_trait]
impl MusicConnection for LyriaSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn set_weighted_prompts(&self, prompts: &[WeightedPrompt]) -> Result<()> {
        self.send_raw(&json!({ "clientContent": { "weightedPrompts": prompts } })).await?;
        tracing::debug!(count = prompts.len(), "Lyria prompts updated");
        Ok(())
    }

    async fn control(&self, control: PlaybackControl) -> Result<()> {
        self.send_raw(&json!({ "playbackControl": control })).await
    }

    async fn next_message(&self) -> Option<Result<MusicMessage>> {
        loop {
            if let Some(message) = self.pending.lock().pop_front() {
                return Some(Ok(message));
            }

            let frame = {
                let mut receiver = self.receiver.lock().await;
                receiver.next().await
            };

            let result = match frame {
                Some(Ok(Message::Text(text))) => self.enqueue(text.as_str()),
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => self.enqueue(text),
                    Err(e) => Err(MusicError::protocol(format!("Invalid UTF-8: {}", e))),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.as_str().to_string());
                    tracing::info!(reason = ?reason, "Lyria stream closed");
                    self.connected.store(false, Ordering::SeqCst);
                    return None;
                }
                Some(Ok(_)) => Ok(()),
                Some(Err(e)) => {
                    self.connected.store(false, Ordering::SeqCst);
                    Err(MusicError::connection(format!("Receive error: {}", e)))
                }
                None => {
                    self.connected.store(false, Ordering::SeqCst);
                    return None;
                }
            };

            if let Err(e) = result {
                return Some(Err(e));
            }
        }
    }

    async fn close(&self) -> Result<()> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Close(None))
            .await
            .map_err(|e| MusicError::connection(format!("Close error: {}", e)))
    }
}

impl std::fmt::Debug for LyriaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LyriaSession")
            .field("session_id", &self.session_id)
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}
