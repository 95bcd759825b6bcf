//! Gemini Live API transport.
//!
//! Connects over a WebSocket to Google's `BidiGenerateContent` endpoint:
//!
//! - Input audio: 16kHz mono PCM
//! - Output audio: 24kHz mono PCM
//! - Video: JPEG frames as realtime input
//!
//! # Example
//!
//! ```rust,ignore
//! use mirror_realtime::gemini::GeminiLiveTransport;
//! use mirror_realtime::{LiveClient, LiveConfig};
//!
//! let transport = GeminiLiveTransport::from_env()?;
//! let client = LiveClient::new(Arc::new(transport));
//! client.connect(DEFAULT_MODEL, LiveConfig::new().with_voice("Aoede")).await?;
//! ```

mod session;
mod transport;

pub use session::GeminiLiveSession;
pub use transport::GeminiLiveTransport;

/// Gemini Live API WebSocket endpoint (without version or key).
pub const GEMINI_LIVE_HOST: &str = "wss://generativelanguage.googleapis.com/ws";

/// API version the endpoint is addressed with.
pub const DEFAULT_API_VERSION: &str = "v1alpha";

/// Default model for Gemini Live.
pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash-live-preview";

/// Available voices for Gemini Live (varies by model).
pub const GEMINI_VOICES: &[&str] = &["Puck", "Charon", "Kore", "Fenrir", "Aoede"];
