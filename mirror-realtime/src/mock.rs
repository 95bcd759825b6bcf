//! In-memory transport for tests.
//!
//! [`MockTransport`] hands out [`MockConnection`]s whose inbound stream is fed
//! by the test and whose outbound traffic is recorded.

use crate::config::LiveConfig;
use crate::error::{LiveError, Result};
use crate::events::{Blob, Content, ServerMessage, ToolResponse};
use crate::session::{BoxedConnection, LiveConnection, LiveTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, mpsc};

/// A message the client sent through a [`MockConnection`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    ClientContent { turns: Vec<Content>, turn_complete: bool },
    RealtimeInput(Vec<Blob>),
    ToolResponse(ToolResponse),
}

/// Scripted transport.
#[derive(Default)]
pub struct MockTransport {
    connections: Mutex<Vec<Arc<MockConnection>>>,
    fail_next: Mutex<Option<String>>,
}

impl MockTransport {
    /// Create a transport whose connects succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `connect` fail with `message`.
    pub fn fail_next_connect(&self, message: impl Into<String>) {
        *self.fail_next.lock() = Some(message.into());
    }

    /// Every connection opened so far.
    pub fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections.lock().clone()
    }

    /// The most recent connection.
    pub fn last_connection(&self) -> Option<Arc<MockConnection>> {
        self.connections.lock().last().cloned()
    }
}

#[async_trait]
impl LiveTransport for MockTransport {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn connect(&self, model: &str, config: &LiveConfig) -> Result<BoxedConnection> {
        if let Some(message) = self.fail_next.lock().take() {
            return Err(LiveError::connection(message));
        }
        let index = self.connections.lock().len();
        let connection = Arc::new(MockConnection::new(format!("mock-{}", index), model, config));
        self.connections.lock().push(connection.clone());
        Ok(connection)
    }
}

/// Scripted connection.
pub struct MockConnection {
    session_id: String,
    model: String,
    config: LiveConfig,
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<Result<ServerMessage>>>>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<ServerMessage>>>,
    outbound: Mutex<Vec<Outbound>>,
    outbound_notify: Notify,
    closed: AtomicBool,
}

impl MockConnection {
    fn new(session_id: String, model: &str, config: &LiveConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session_id,
            model: model.to_string(),
            config: config.clone(),
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: tokio::sync::Mutex::new(rx),
            outbound: Mutex::new(Vec::new()),
            outbound_notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Model the connection was opened for.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Config the connection was opened with.
    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Deliver a server message.
    pub fn push(&self, message: ServerMessage) {
        if let Some(tx) = self.inbound_tx.lock().as_ref() {
            let _ = tx.send(Ok(message));
        }
    }

    /// Deliver a receive error.
    pub fn push_error(&self, error: LiveError) {
        if let Some(tx) = self.inbound_tx.lock().as_ref() {
            let _ = tx.send(Err(error));
        }
    }

    /// Close the inbound stream as if the server hung up.
    pub fn end_stream(&self) {
        self.inbound_tx.lock().take();
    }

    /// Whether the client closed this connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<Outbound> {
        self.outbound.lock().clone()
    }

    /// Wait until at least `count` messages were sent.
    pub async fn wait_for_sent(&self, count: usize) -> Vec<Outbound> {
        loop {
            let notified = self.outbound_notify.notified();
            {
                let outbound = self.outbound.lock();
                if outbound.len() >= count {
                    return outbound.clone();
                }
            }
            notified.await;
        }
    }

    fn record(&self, message: Outbound) -> Result<()> {
        if self.is_closed() {
            return Err(LiveError::NotConnected);
        }
        self.outbound.lock().push(message);
        self.outbound_notify.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl LiveConnection for MockConnection {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn send_client_content(&self, turns: Vec<Content>, turn_complete: bool) -> Result<()> {
        self.record(Outbound::ClientContent { turns, turn_complete })
    }

    async fn send_realtime_input(&self, media: Vec<Blob>) -> Result<()> {
        self.record(Outbound::RealtimeInput(media))
    }

    async fn send_tool_response(&self, response: ToolResponse) -> Result<()> {
        self.record(Outbound::ToolResponse(response))
    }

    async fn next_message(&self) -> Option<Result<ServerMessage>> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.end_stream();
        Ok(())
    }
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection")
            .field("session_id", &self.session_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
