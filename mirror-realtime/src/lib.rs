//! # mirror-realtime
//!
//! Live session adapter for the Magic Mirror avatar.
//!
//! A [`LiveClient`] owns at most one bidirectional session with a live
//! multimodal model. It streams camera frames and text in, fans server
//! events (speech audio, interruptions, turn boundaries, tool calls) out to
//! [`LiveEventListener`]s, and answers tool calls from a [`ToolRegistry`].
//!
//! ```text
//!  LiveClient ──► LiveTransport ──► LiveConnection (one per session)
//!      │                                  │
//!      ├── listeners ◄── LiveEvent ◄──────┘
//!      └── ToolRegistry ──► ToolResponse (one batch per tool call)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use mirror_realtime::{LiveClient, LiveConfig, ToolOutcome, ToolRegistry, FunctionDeclaration};
//! use mirror_realtime::gemini::{GeminiLiveTransport, DEFAULT_MODEL};
//!
//! let tools = ToolRegistry::new()
//!     .with_tool_fn(FunctionDeclaration::new("clearImage"), |_| Ok(ToolOutcome::ok()));
//!
//! let client = LiveClient::with_tools(Arc::new(GeminiLiveTransport::from_env()?), tools);
//! client.connect(DEFAULT_MODEL, LiveConfig::new().with_voice("Aoede")).await?;
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod mock;
pub mod session;
pub mod tools;

// Provider implementations
#[cfg(feature = "gemini")]
pub mod gemini;

// Re-exports
#[cfg(feature = "gemini")]
pub use auth::ensure_crypto_provider;
pub use auth::{API_KEY_VARS, api_key_from_env};
pub use client::{ConnectionStatus, LiveClient, LiveEventListener, SubscriptionId, TracingListener};
pub use config::{
    AutomaticActivityDetection, ContextWindowCompression, FunctionBehavior, FunctionDeclaration,
    LiveConfig, MediaResolution, Modality,
};
pub use error::{LiveError, Result, ToolExecutionError};
pub use events::{
    Blob, Content, FunctionCall, FunctionResponse, LiveEvent, Part, Scheduling, ServerMessage,
    ToolCall, ToolResponse,
};
pub use session::{BoxedConnection, BoxedTransport, LiveConnection, LiveTransport};
pub use tools::{FnToolHandler, ToolHandler, ToolOutcome, ToolRegistry, ToolResult};
