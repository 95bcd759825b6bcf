use crate::auth::ensure_crypto_provider;
use crate::config::LiveConfig;
use crate::error::{LiveError, Result};
use crate::events::{Blob, Content, ServerMessage, ToolResponse, parse_server_message};
use crate::session::LiveConnection;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite::Message};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures::stream::SplitSink<WsStream, Message>;
type WsSource = futures::stream::SplitStream<WsStream>;

/// Gemini Live session.
///
/// One WebSocket frame may carry several messages (e.g. audio parts plus
/// `turnComplete`); they are queued and handed out one at a time.
pub struct GeminiLiveSession {
    session_id: String,
    connected: AtomicBool,
    sender: Mutex<WsSink>,
    receiver: Mutex<WsSource>,
    pending: parking_lot::Mutex<VecDeque<ServerMessage>>,
    close_reason: parking_lot::Mutex<Option<String>>,
}

impl GeminiLiveSession {
    /// Connect to `endpoint` and send the setup for `model`.
    pub async fn connect(endpoint: url::Url, model: &str, config: &LiveConfig) -> Result<Self> {
        ensure_crypto_provider();

        let request = endpoint.as_str().into_client_request().map_err(|e| {
            LiveError::connection(format!("Failed to create client request: {}", e))
        })?;
        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| LiveError::connection(format!("WebSocket connect error: {}", e)))?;

        let (sink, source) = stream.split();

        let session = Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            connected: AtomicBool::new(true),
            sender: Mutex::new(sink),
            receiver: Mutex::new(source),
            pending: parking_lot::Mutex::new(VecDeque::new()),
            close_reason: parking_lot::Mutex::new(None),
        };

        let setup = config.to_setup(model);
        tracing::info!(model_id = %model, "Sending setup message");
        tracing::debug!(raw_setup = %setup, "Raw setup message");
        session.send_raw(&setup).await?;

        Ok(session)
    }

    /// Whether the socket is still open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_raw<T: Serialize>(&self, value: &T) -> Result<()> {
        if !self.is_connected() {
            return Err(LiveError::NotConnected);
        }
        let msg = serde_json::to_string(value)
            .map_err(|e| LiveError::protocol(format!("JSON serialize error: {}", e)))?;

        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Text(msg.into()))
            .await
            .map_err(|e| LiveError::connection(format!("Send error: {}", e)))?;

        Ok(())
    }

    fn enqueue(&self, raw: &str) -> Result<()> {
        tracing::trace!(%raw, "Received live frame");
        let messages = parse_server_message(raw)?;
        self.pending.lock().extend(messages);
        Ok(())
    }

    fn mark_closed(&self, reason: Option<String>) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(reason) = reason.filter(|r| !r.is_empty()) {
            self.close_reason.lock().get_or_insert(reason);
        }
    }
}

#[async_trait]
impl LiveConnection for GeminiLiveSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn send_client_content(&self, turns: Vec<Content>, turn_complete: bool) -> Result<()> {
        self.send_raw(&json!({
            "clientContent": { "turns": turns, "turnComplete": turn_complete }
        }))
        .await
    }

    async fn send_realtime_input(&self, media: Vec<Blob>) -> Result<()> {
        self.send_raw(&json!({ "realtimeInput": { "mediaChunks": media } })).await
    }

    async fn send_tool_response(&self, response: ToolResponse) -> Result<()> {
        self.send_raw(&json!({ "toolResponse": response })).await
    }

    async fn next_message(&self) -> Option<Result<ServerMessage>> {
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
                    Err(e) => Err(LiveError::protocol(format!(
                        "Invalid UTF-8 in binary message: {}",
                        e
                    ))),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.as_str().to_string());
                    tracing::info!(reason = ?reason, "Server closed the live session");
                    self.mark_closed(reason);
                    return None;
                }
                Some(Ok(_)) => Ok(()),
                Some(Err(e)) => {
                    self.mark_closed(None);
                    Err(LiveError::connection(format!("Receive error: {}", e)))
                }
                None => {
                    self.mark_closed(None);
                    return None;
                }
            };

            if let Err(e) = result {
                return Some(Err(e));
            }
        }
    }

    fn close_reason(&self) -> Option<String> {
        self.close_reason.lock().clone()
    }

    async fn close(&self) -> Result<()> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Close(None))
            .await
            .map_err(|e| LiveError::connection(format!("Close error: {}", e)))?;

        Ok(())
    }
}

impl std::fmt::Debug for GeminiLiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiLiveSession")
            .field("session_id", &self.session_id)
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}
