//! # mirror-telemetry
//!
//! Structured logging for the Magic Mirror crates.
//!
//! ## Usage
//!
//! ```rust
//! use mirror_telemetry::{init_telemetry, info, live_session_span};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_telemetry("magic-mirror")?;
//!
//!     let span = live_session_span("gemini", "models/gemini-2.5-flash-live-preview");
//!     let _enter = span.enter();
//!     info!("Session starting");
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Span, debug, error, info, instrument, trace, warn};

// Re-export span helpers
pub use spans::*;

// Re-export init functions
pub use init::{LogFormat, init_telemetry, init_with_format};
