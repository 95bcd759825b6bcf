//! The live client: owns at most one session and fans its events out to
//! listeners.
//!
//! ```text
//!   connect()                 reader task                    listeners
//!  ──────────► transport ──► next_message() ──► ServerMessage ──► on_event()
//!                                     │
//!                                     └─ ToolCall ──► ToolRegistry ──► send_tool_response()
//! ```
//!
//! Every session carries a generation number. Teardown bumps it, so a reader
//! task or tool batch that outlives its session can tell it is stale and
//! never touches the next one.

use crate::config::LiveConfig;
use crate::error::{LiveError, Result};
use crate::events::{Blob, Content, FunctionCall, LiveEvent, ServerMessage, ToolCall, ToolResponse};
use crate::session::{BoxedConnection, BoxedTransport};
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Lifecycle state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Connected, but the user barged in and the model has not resumed.
    Interrupted,
}

impl ConnectionStatus {
    /// Whether a session is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Connected | Self::Interrupted)
    }
}

/// Receives session events.
///
/// Override [`on_event`](Self::on_event) to see everything, or the
/// per-kind methods for the events you care about. Errors are logged and
/// never reach the session.
#[async_trait]
pub trait LiveEventListener: Send + Sync {
    /// Entry point for every event.
    async fn on_event(&self, event: &LiveEvent) -> Result<()> {
        match event {
            LiveEvent::Open => self.on_open().await,
            LiveEvent::Close { reason } => self.on_close(reason.as_deref()).await,
            LiveEvent::Error(message) => self.on_error(message).await,
            LiveEvent::SetupComplete => self.on_setup_complete().await,
            LiveEvent::Audio { data, mime_type } => self.on_audio(data, mime_type).await,
            LiveEvent::Text(text) => self.on_text(text).await,
            LiveEvent::Interrupted => self.on_interrupted().await,
            LiveEvent::TurnComplete => self.on_turn_complete().await,
            LiveEvent::ToolCall(call) => self.on_tool_call(call).await,
            LiveEvent::ToolCallCancellation(ids) => self.on_tool_call_cancellation(ids).await,
        }
    }

    async fn on_open(&self) -> Result<()> {
        Ok(())
    }

    async fn on_close(&self, _reason: Option<&str>) -> Result<()> {
        Ok(())
    }

    async fn on_error(&self, _message: &str) -> Result<()> {
        Ok(())
    }

    async fn on_setup_complete(&self) -> Result<()> {
        Ok(())
    }

    /// Called for every chunk of model speech.
    async fn on_audio(&self, _data: &Bytes, _mime_type: &str) -> Result<()> {
        Ok(())
    }

    async fn on_text(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn on_interrupted(&self) -> Result<()> {
        Ok(())
    }

    async fn on_turn_complete(&self) -> Result<()> {
        Ok(())
    }

    /// Called before the batch is dispatched to the registry.
    async fn on_tool_call(&self, _call: &ToolCall) -> Result<()> {
        Ok(())
    }

    async fn on_tool_call_cancellation(&self, _ids: &[String]) -> Result<()> {
        Ok(())
    }
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingListener;

#[async_trait]
impl LiveEventListener for TracingListener {
    async fn on_event(&self, event: &LiveEvent) -> Result<()> {
        match event {
            LiveEvent::Audio { data, .. } => {
                tracing::trace!(bytes = data.len(), "server.audio");
            }
            LiveEvent::Text(text) => tracing::info!(%text, "server.content"),
            LiveEvent::ToolCall(call) => {
                let names: Vec<&str> = call.function_calls.iter().map(|c| c.name.as_str()).collect();
                tracing::info!(?names, "server.toolCall");
            }
            LiveEvent::Error(message) => tracing::warn!(%message, "client.error"),
            other => tracing::debug!(event = other.kind(), "client.event"),
        }
        Ok(())
    }
}

/// Handle returned by [`LiveClient::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct SessionSlot {
    status: ConnectionStatus,
    generation: u64,
    connection: Option<BoxedConnection>,
    cancel: Option<CancellationToken>,
    setup_complete: bool,
    handled_calls: HashSet<String>,
}

struct ClientInner {
    transport: BoxedTransport,
    tools: Option<Arc<ToolRegistry>>,
    listeners: RwLock<Vec<(SubscriptionId, Arc<dyn LiveEventListener>)>>,
    next_subscription: AtomicU64,
    slot: Mutex<SessionSlot>,
}

/// Client for a live multimodal session.
///
/// Cheap to clone; clones share the same session.
///
/// # Example
///
/// ```rust,ignore
/// use mirror_realtime::{LiveClient, LiveConfig, TracingListener};
/// use mirror_realtime::gemini::GeminiLiveTransport;
///
/// let client = LiveClient::new(Arc::new(GeminiLiveTransport::from_env()?));
/// client.subscribe(Arc::new(TracingListener));
/// client.connect("models/gemini-live-2.5-flash-preview", LiveConfig::new()).await?;
/// client.send_text("Bonjour !").await?;
/// ```
#[derive(Clone)]
pub struct LiveClient {
    inner: Arc<ClientInner>,
}

impl LiveClient {
    /// Create a client with no tools.
    pub fn new(transport: BoxedTransport) -> Self {
        Self::build(transport, None)
    }

    /// Create a client whose tool calls are answered from `tools`.
    pub fn with_tools(transport: BoxedTransport, tools: ToolRegistry) -> Self {
        Self::build(transport, Some(Arc::new(tools)))
    }

    fn build(transport: BoxedTransport, tools: Option<Arc<ToolRegistry>>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                tools,
                listeners: RwLock::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
                slot: Mutex::new(SessionSlot::default()),
            }),
        }
    }

    /// The tool registry, if any.
    pub fn tools(&self) -> Option<&ToolRegistry> {
        self.inner.tools.as_deref()
    }

    /// Register a listener.
    pub fn subscribe(&self, listener: Arc<dyn LiveEventListener>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.slot.lock().status
    }

    /// Whether a session is open.
    pub fn is_connected(&self) -> bool {
        self.status().is_open()
    }

    /// Whether the open session finished its setup handshake.
    pub fn is_setup_complete(&self) -> bool {
        let slot = self.inner.slot.lock();
        slot.status.is_open() && slot.setup_complete
    }

    /// ID of the open session.
    pub fn session_id(&self) -> Option<String> {
        self.inner.slot.lock().connection.as_ref().map(|c| c.session_id().to_string())
    }

    /// Open a session, tearing down any prior one first.
    ///
    /// On success listeners see `open`; a replaced session produces exactly
    /// one `close` before it. On failure listeners see `error` and the
    /// client is left disconnected.
    pub async fn connect(&self, model: &str, config: LiveConfig) -> Result<()> {
        self.inner.teardown(None, Some("reconnecting".to_string())).await;

        let generation = {
            let mut slot = self.inner.slot.lock();
            slot.generation += 1;
            slot.status = ConnectionStatus::Connecting;
            slot.generation
        };

        let span = mirror_telemetry::live_session_span(self.inner.transport.provider(), model);
        let result = self.inner.transport.connect(model, &config).instrument(span.clone()).await;

        let connection = match result {
            Ok(connection) => connection,
            Err(e) => {
                {
                    let mut slot = self.inner.slot.lock();
                    if slot.generation == generation {
                        slot.status = ConnectionStatus::Disconnected;
                    }
                }
                tracing::error!(parent: &span, error = %e, "Failed to open live session");
                self.inner.emit(&LiveEvent::Error(e.to_string())).await;
                return Err(match e {
                    LiveError::ConnectionError(_) => e,
                    other => LiveError::connection(other.to_string()),
                });
            }
        };

        let cancel = CancellationToken::new();
        let superseded = {
            let mut slot = self.inner.slot.lock();
            if slot.generation == generation {
                slot.status = ConnectionStatus::Connected;
                slot.connection = Some(connection.clone());
                slot.cancel = Some(cancel.clone());
                slot.setup_complete = false;
                slot.handled_calls.clear();
                false
            } else {
                true
            }
        };
        if superseded {
            let _ = connection.close().await;
            return Err(LiveError::connection("Connect superseded by another request"));
        }

        tracing::info!(parent: &span, session_id = connection.session_id(), "Live session opened");
        self.inner.emit(&LiveEvent::Open).await;

        let inner = self.inner.clone();
        tokio::spawn(run_reader(inner, connection, generation, cancel).instrument(span));
        Ok(())
    }

    /// Close the session. Idempotent; `close` is emitted only when a session
    /// was actually open.
    pub async fn disconnect(&self) -> Result<()> {
        self.inner.teardown(None, None).await;
        Ok(())
    }

    /// Send conversation turns.
    pub async fn send(&self, turns: Vec<Content>, turn_complete: bool) -> Result<()> {
        self.connection()?.send_client_content(turns, turn_complete).await
    }

    /// Send a single user text turn.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(vec![Content::user_text(text)], true).await
    }

    /// Stream realtime media.
    pub async fn send_realtime_input(&self, media: Vec<Blob>) -> Result<()> {
        self.connection()?.send_realtime_input(media).await
    }

    /// Send a tool response by hand.
    pub async fn send_tool_response(&self, response: ToolResponse) -> Result<()> {
        self.connection()?.send_tool_response(response).await
    }

    fn connection(&self) -> Result<BoxedConnection> {
        self.inner.slot.lock().connection.clone().ok_or(LiveError::NotConnected)
    }
}

impl std::fmt::Debug for LiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.inner.slot.lock();
        f.debug_struct("LiveClient")
            .field("provider", &self.inner.transport.provider())
            .field("status", &slot.status)
            .field("generation", &slot.generation)
            .finish()
    }
}

impl ClientInner {
    async fn emit(&self, event: &LiveEvent) {
        let listeners: Vec<Arc<dyn LiveEventListener>> =
            self.listeners.read().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            if let Err(e) = listener.on_event(event).await {
                tracing::warn!(event = event.kind(), error = %e, "Listener failed");
            }
        }
    }

    /// Tear down the open session. With `expected`, only if it is still
    /// that generation. Returns whether a session was closed.
    async fn teardown(&self, expected: Option<u64>, reason: Option<String>) -> bool {
        let (connection, cancel) = {
            let mut slot = self.slot.lock();
            if expected.is_some_and(|g| g != slot.generation) {
                return false;
            }
            if slot.status == ConnectionStatus::Disconnected {
                return false;
            }
            slot.generation += 1;
            slot.status = ConnectionStatus::Disconnected;
            slot.setup_complete = false;
            slot.handled_calls.clear();
            (slot.connection.take(), slot.cancel.take())
        };

        if let Some(cancel) = cancel {
            cancel.cancel();
        }

        let Some(connection) = connection else {
            return false;
        };
        if let Err(e) = connection.close().await {
            tracing::debug!(error = %e, "Close on a finished connection");
        }
        tracing::info!(session_id = connection.session_id(), reason = ?reason, "Live session closed");
        self.emit(&LiveEvent::Close { reason }).await;
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        self.slot.lock().generation == generation
    }

    /// Leave the interrupted state once the model produces output again.
    fn resume(&self, generation: u64) {
        let mut slot = self.slot.lock();
        if slot.generation == generation && slot.status == ConnectionStatus::Interrupted {
            slot.status = ConnectionStatus::Connected;
        }
    }

    async fn handle_message(
        &self,
        generation: u64,
        connection: &BoxedConnection,
        message: ServerMessage,
    ) {
        match message {
            ServerMessage::SetupComplete => {
                {
                    let mut slot = self.slot.lock();
                    if slot.generation == generation {
                        slot.setup_complete = true;
                    }
                }
                self.emit(&LiveEvent::SetupComplete).await;
            }
            ServerMessage::Audio { data, mime_type } => {
                self.resume(generation);
                self.emit(&LiveEvent::Audio { data, mime_type }).await;
            }
            ServerMessage::Text(text) => {
                self.resume(generation);
                self.emit(&LiveEvent::Text(text)).await;
            }
            ServerMessage::Interrupted => {
                {
                    let mut slot = self.slot.lock();
                    if slot.generation == generation && slot.status == ConnectionStatus::Connected {
                        slot.status = ConnectionStatus::Interrupted;
                    }
                }
                self.emit(&LiveEvent::Interrupted).await;
            }
            ServerMessage::TurnComplete => {
                self.resume(generation);
                self.emit(&LiveEvent::TurnComplete).await;
            }
            ServerMessage::ToolCall(call) => {
                self.emit(&LiveEvent::ToolCall(call.clone())).await;
                self.dispatch_tools(generation, connection, call.function_calls);
            }
            ServerMessage::ToolCallCancellation(ids) => {
                self.emit(&LiveEvent::ToolCallCancellation(ids)).await;
            }
            ServerMessage::GoAway { time_left } => {
                tracing::warn!(time_left = ?time_left, "Server will close the session soon");
            }
            ServerMessage::Unknown => {
                tracing::trace!("Ignoring unknown server message");
            }
        }
    }

    /// Run a tool batch off the reader task and send one batched response.
    ///
    /// Without a registry every call is answered as an unknown tool.
    fn dispatch_tools(&self, generation: u64, connection: &BoxedConnection, calls: Vec<FunctionCall>) {
        let tools = self.tools.clone().unwrap_or_else(|| Arc::new(ToolRegistry::new()));

        let calls: Vec<FunctionCall> = {
            let mut slot = self.slot.lock();
            if slot.generation != generation {
                return;
            }
            calls
                .into_iter()
                .filter(|call| call.id.is_empty() || slot.handled_calls.insert(call.id.clone()))
                .collect()
        };
        if calls.is_empty() {
            return;
        }

        let connection = connection.clone();
        tokio::spawn(async move {
            let response = tools.dispatch_all(calls).await;
            tracing::debug!(count = response.function_responses.len(), "Sending tool responses");
            if let Err(e) = connection.send_tool_response(response).await {
                tracing::warn!(error = %e, "Failed to send tool responses");
            }
        });
    }
}

async fn run_reader(
    inner: Arc<ClientInner>,
    connection: BoxedConnection,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = connection.next_message() => next,
        };
        if cancel.is_cancelled() || !inner.is_current(generation) {
            return;
        }

        match next {
            Some(Ok(message)) => inner.handle_message(generation, &connection, message).await,
            Some(Err(e)) if e.is_fatal() => {
                tracing::warn!(error = %e, "Live session failed");
                inner.emit(&LiveEvent::Error(e.to_string())).await;
                inner.teardown(Some(generation), Some(e.to_string())).await;
                return;
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Live session message error");
                inner.emit(&LiveEvent::Error(e.to_string())).await;
            }
            None => {
                let reason =
                    connection.close_reason().unwrap_or_else(|| "closed by server".to_string());
                inner.teardown(Some(generation), Some(reason)).await;
                return;
            }
        }
    }
}
