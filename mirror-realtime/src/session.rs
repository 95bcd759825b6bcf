//! Transport seam: how a live session is opened and driven.

use crate::config::LiveConfig;
use crate::error::Result;
use crate::events::{Blob, Content, ServerMessage, ToolResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// One open bidirectional session with a live endpoint.
///
/// Senders may be called concurrently with [`next_message`](Self::next_message);
/// implementations serialize writes internally.
#[async_trait]
pub trait LiveConnection: Send + Sync {
    /// Get the session ID.
    fn session_id(&self) -> &str;

    /// Send conversation turns.
    async fn send_client_content(&self, turns: Vec<Content>, turn_complete: bool) -> Result<()>;

    /// Stream realtime media (audio or video frames).
    async fn send_realtime_input(&self, media: Vec<Blob>) -> Result<()>;

    /// Answer a batch of function calls.
    async fn send_tool_response(&self, response: ToolResponse) -> Result<()>;

    /// Get the next message from the server.
    ///
    /// Returns `None` once the session is closed.
    async fn next_message(&self) -> Option<Result<ServerMessage>>;

    /// Reason the server gave when it closed the session, if any.
    fn close_reason(&self) -> Option<String> {
        None
    }

    /// Close the session.
    async fn close(&self) -> Result<()>;
}

/// Shared connection handle.
pub type BoxedConnection = Arc<dyn LiveConnection>;

/// Opens live sessions against a provider.
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Provider name, for logging.
    fn provider(&self) -> &str;

    /// Open a session for `model` and send its setup.
    async fn connect(&self, model: &str, config: &LiveConfig) -> Result<BoxedConnection>;
}

/// Shared transport handle.
pub type BoxedTransport = Arc<dyn LiveTransport>;
