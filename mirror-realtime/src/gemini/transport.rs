//! Gemini Live transport: builds the endpoint URL and opens sessions.

use super::session::GeminiLiveSession;
use super::{DEFAULT_API_VERSION, GEMINI_LIVE_HOST};
use crate::auth::{api_key_from_env, missing_api_key_message};
use crate::config::LiveConfig;
use crate::error::{LiveError, Result};
use crate::session::{BoxedConnection, LiveTransport};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Opens Gemini Live sessions with an API key.
#[derive(Clone)]
pub struct GeminiLiveTransport {
    api_key: SecretString,
    api_version: String,
    host: String,
}

impl GeminiLiveTransport {
    /// Create a transport for the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            api_version: DEFAULT_API_VERSION.to_string(),
            host: GEMINI_LIVE_HOST.to_string(),
        }
    }

    /// Read the API key from `GEMINI_API_KEY` or `GOOGLE_API_KEY`.
    pub fn from_env() -> Result<Self> {
        api_key_from_env()
            .map(Self::new)
            .ok_or_else(|| LiveError::config(missing_api_key_message()))
    }

    /// Override the API version (default `v1alpha`).
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Override the WebSocket host, e.g. for a local proxy.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Full endpoint URL, key included.
    pub(crate) fn endpoint(&self) -> Result<url::Url> {
        let raw = format!(
            "{}/google.ai.generativelanguage.{}.GenerativeService.BidiGenerateContent",
            self.host.trim_end_matches('/'),
            self.api_version
        );
        let mut url = url::Url::parse(&raw)
            .map_err(|e| LiveError::config(format!("Invalid live endpoint {}: {}", raw, e)))?;
        url.query_pairs_mut().append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }
}

#[async_trait]
impl LiveTransport for GeminiLiveTransport {
    fn provider(&self) -> &str {
        "gemini"
    }

    async fn connect(&self, model: &str, config: &LiveConfig) -> Result<BoxedConnection> {
        let session = GeminiLiveSession::connect(self.endpoint()?, model, config).await?;
        Ok(Arc::new(session))
    }
}

impl std::fmt::Debug for GeminiLiveTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiLiveTransport")
            .field("api_version", &self.api_version)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_carries_version_and_key() {
        let transport = GeminiLiveTransport::new("abc 123");
        let url = transport.endpoint().unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.host_str(), Some("generativelanguage.googleapis.com"));
        assert!(url.path().ends_with("v1alpha.GenerativeService.BidiGenerateContent"));
        assert_eq!(url.query(), Some("key=abc+123"));
    }

    #[test]
    fn test_custom_host_and_version() {
        let transport = GeminiLiveTransport::new("k")
            .with_host("ws://localhost:9000/ws/")
            .with_api_version("v1beta");
        let url = transport.endpoint().unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:9000/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent?key=k"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", GeminiLiveTransport::new("top-secret"));
        assert!(!debug.contains("top-secret"));
    }
}
