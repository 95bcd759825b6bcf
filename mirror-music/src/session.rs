//! Transport seam for music sessions and the inbound message format.

use crate::error::{MusicError, Result};
use crate::prompts::WeightedPrompt;
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Playback commands understood by the music model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackControl {
    Play,
    Pause,
    /// Stop and reset the generated stream.
    Stop,
}

/// A message received from the music endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum MusicMessage {
    /// Setup handshake finished.
    SetupComplete,
    /// 16-bit PCM, 44.1kHz stereo.
    AudioChunk(Bytes),
    /// A prompt was rejected by the safety filter.
    FilteredPrompt {
        text: String,
        reason: String,
    },
    /// Anything not understood.
    Unknown,
}

/// Translate one raw frame into the messages it carries.
pub fn parse_music_message(raw: &str) -> Result<Vec<MusicMessage>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| MusicError::protocol(format!("Parse error: {}, raw: {}", e, raw)))?;

    let mut messages = Vec::new();

    if value.get("setupComplete").is_some() {
        messages.push(MusicMessage::SetupComplete);
    }

    let chunks = value
        .get("serverContent")
        .and_then(|c| c.get("audioChunks"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for chunk in chunks {
        let Some(data) = chunk.get("data").and_then(Value::as_str) else {
            continue;
        };
        match base64::engine::general_purpose::STANDARD.decode(data) {
            Ok(decoded) => messages.push(MusicMessage::AudioChunk(Bytes::from(decoded))),
            Err(e) => tracing::warn!(error = %e, "Dropping undecodable music chunk"),
        }
    }

    if let Some(filtered) = value.get("filteredPrompt") {
        let field = |key: &str| {
            filtered.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
        };
        messages.push(MusicMessage::FilteredPrompt {
            text: field("text"),
            reason: field("filteredReason"),
        });
    }

    if messages.is_empty() {
        messages.push(MusicMessage::Unknown);
    }
    Ok(messages)
}

/// One open music streaming session.
#[async_trait]
pub trait MusicConnection: Send + Sync {
    /// Get the session ID.
    fn session_id(&self) -> &str;

    /// Replace the steering prompts.
    async fn set_weighted_prompts(&self, prompts: &[WeightedPrompt]) -> Result<()>;

    /// Send a playback command.
    async fn control(&self, control: PlaybackControl) -> Result<()>;

    /// Get the next message from the server.
    ///
    /// Returns `None` once the session is closed.
    async fn next_message(&self) -> Option<Result<MusicMessage>>;

    /// Close the session.
    async fn close(&self) -> Result<()>;
}

/// Shared connection handle.
pub type BoxedMusicConnection = Arc<dyn MusicConnection>;

/// Opens music sessions.
#[async_trait]
pub trait MusicTransport: Send + Sync {
    /// Open a session for `model`; returns once setup completed.
    async fn connect(&self, model: &str) -> Result<BoxedMusicConnection>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_audio_chunks() {
        let raw = r#"{"serverContent":{"audioChunks":[{"data":"AAEC","mimeType":"audio/l16"},{"data":"AwQF"}]}}"#;
        let messages = parse_music_message(raw).unwrap();
        assert_eq!(
            messages,
            vec![
                MusicMessage::AudioChunk(Bytes::from_static(&[0, 1, 2])),
                MusicMessage::AudioChunk(Bytes::from_static(&[3, 4, 5])),
            ]
        );
    }

    #[test]
    fn test_parse_filtered_prompt() {
        let raw = r#"{"filteredPrompt":{"text":"bad idea","filteredReason":"SAFETY"}}"#;
        assert_eq!(
            parse_music_message(raw).unwrap(),
            vec![MusicMessage::FilteredPrompt { text: "bad idea".into(), reason: "SAFETY".into() }]
        );
    }

    #[test]
    fn test_parse_setup_and_unknown() {
        assert_eq!(parse_music_message(r#"{"setupComplete":{}}"#).unwrap(), vec![
            MusicMessage::SetupComplete
        ]);
        assert_eq!(parse_music_message("{}").unwrap(), vec![MusicMessage::Unknown]);
    }

    #[test]
    fn test_control_wire_names() {
        assert_eq!(serde_json::to_value(PlaybackControl::Pause).unwrap(), "PAUSE");
    }
}
