//! Message and event types for live sessions.
//!
//! Outbound payloads (`Content`, `Blob`, `ToolResponse`) serialize to the
//! camelCase wire format of the Live API. Inbound frames are translated by
//! [`parse_server_message`] into [`ServerMessage`]s, which the client turns
//! into [`LiveEvent`]s for listeners.

use crate::error::{LiveError, Result};
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

// ── Outbound payloads ───────────────────────────────────────────────────

/// Binary payload with its mime type, base64-encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// Mime type, e.g. `image/jpeg` or `audio/pcm;rate=16000`.
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

impl Blob {
    /// Encode raw bytes.
    pub fn new(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Wrap data that is already base64-encoded.
    pub fn from_base64(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self { mime_type: mime_type.into(), data: data.into() }
    }

    /// A JPEG video frame.
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self::new("image/jpeg", bytes)
    }

    /// 16-bit PCM microphone audio at `sample_rate`.
    pub fn pcm16(bytes: &[u8], sample_rate: u32) -> Self {
        Self::new(format!("audio/pcm;rate={}", sample_rate), bytes)
    }

    /// Decode the payload.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| LiveError::protocol(format!("Invalid base64 payload: {}", e)))
    }

    /// Render as a `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// One part of a content turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline binary content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

impl Part {
    /// A text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    /// An inline data part.
    pub fn inline(blob: Blob) -> Self {
        Self { text: None, inline_data: Some(blob) }
    }
}

/// A conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`.
    pub role: String,
    /// Parts of the turn.
    pub parts: Vec<Part>,
}

impl Content {
    /// A user turn.
    pub fn user(parts: Vec<Part>) -> Self {
        Self { role: "user".to_string(), parts }
    }

    /// A single-text user turn.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::text(text)])
    }
}

// ── Tool calls ──────────────────────────────────────────────────────────

/// A function the model asks the client to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Call ID, echoed in the response.
    #[serde(default)]
    pub id: String,
    /// Function name.
    pub name: String,
    /// Arguments object.
    #[serde(default)]
    pub args: Value,
}

impl FunctionCall {
    /// Create a function call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self { id: id.into(), name: name.into(), args }
    }

    /// String argument `key`, if present.
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

/// A batch of function calls delivered in one server message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Calls in arrival order.
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

/// How urgently the model should surface a function response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scheduling {
    /// Speak about the result once the current turn ends.
    #[default]
    WhenIdle,
    /// Cut the current playback and respond right away.
    Interrupt,
    /// Take the result silently.
    Silent,
}

/// Response to one [`FunctionCall`].
///
/// `response` holds the result fields plus a `scheduling` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// ID of the call being answered.
    pub id: String,
    /// Function name.
    pub name: String,
    /// Result payload.
    pub response: Value,
}

impl FunctionResponse {
    /// Successful response. Non-object results are wrapped as `{result: ...}`.
    pub fn success(call: &FunctionCall, result: Value, scheduling: Scheduling) -> Self {
        let mut response = match result {
            Value::Object(map) => Value::Object(map),
            other => json!({ "result": other }),
        };
        response["scheduling"] = json!(scheduling);
        Self { id: call.id.clone(), name: call.name.clone(), response }
    }

    /// Error-tagged response: `{result: "error", error: message}`.
    pub fn error(call: &FunctionCall, message: impl Into<String>) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            response: json!({
                "result": "error",
                "error": message.into(),
                "scheduling": Scheduling::WhenIdle,
            }),
        }
    }

    /// Whether this response is error-tagged.
    pub fn is_error(&self) -> bool {
        self.response.get("result").and_then(Value::as_str) == Some("error")
    }

    /// Error message, if error-tagged.
    pub fn error_message(&self) -> Option<&str> {
        self.response.get("error").and_then(Value::as_str)
    }

    /// Scheduling hint carried in the payload.
    pub fn scheduling(&self) -> Scheduling {
        self.response
            .get("scheduling")
            .and_then(|s| serde_json::from_value(s.clone()).ok())
            .unwrap_or_default()
    }
}

/// All responses for one [`ToolCall`], sent together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    /// Responses in call order.
    pub function_responses: Vec<FunctionResponse>,
}

// ── Inbound ─────────────────────────────────────────────────────────────

/// A message received from the live endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Setup handshake finished; realtime input may flow.
    SetupComplete,
    /// Chunk of synthesized speech.
    Audio {
        /// Raw PCM bytes.
        data: Bytes,
        /// Mime type, e.g. `audio/pcm;rate=24000`.
        mime_type: String,
    },
    /// Model text output.
    Text(String),
    /// The user barged in; queued speech should be dropped.
    Interrupted,
    /// The model finished its turn.
    TurnComplete,
    /// The model requests function calls.
    ToolCall(ToolCall),
    /// Previously issued calls were cancelled.
    ToolCallCancellation(Vec<String>),
    /// The server will close the connection soon.
    GoAway {
        /// Remaining time, as reported.
        time_left: Option<String>,
    },
    /// Anything not understood.
    Unknown,
}

/// Translate one raw frame into the messages it carries.
///
/// A single frame may hold several parts (audio chunks, text) plus turn
/// flags; they are returned in wire order.
pub fn parse_server_message(raw: &str) -> Result<Vec<ServerMessage>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| LiveError::protocol(format!("Parse error: {}, raw: {}", e, raw)))?;

    let mut messages = Vec::new();

    if value.get("setupComplete").is_some() {
        messages.push(ServerMessage::SetupComplete);
    }

    if let Some(content) = value.get("serverContent") {
        if content.get("interrupted").and_then(Value::as_bool).unwrap_or(false) {
            messages.push(ServerMessage::Interrupted);
        }

        let parts = content
            .get("modelTurn")
            .and_then(|turn| turn.get("parts"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for part in parts {
            if let Some(inline) = part.get("inlineData") {
                let mime_type =
                    inline.get("mimeType").and_then(Value::as_str).unwrap_or("audio/pcm");
                let Some(data) = inline.get("data").and_then(Value::as_str) else {
                    continue;
                };
                if !mime_type.starts_with("audio/") {
                    tracing::debug!(%mime_type, "Ignoring non-audio inline data");
                    continue;
                }
                match base64::engine::general_purpose::STANDARD.decode(data) {
                    Ok(decoded) => messages.push(ServerMessage::Audio {
                        data: Bytes::from(decoded),
                        mime_type: mime_type.to_string(),
                    }),
                    Err(e) => tracing::warn!(error = %e, "Dropping undecodable audio part"),
                }
            } else if let Some(text) = part.get("text").and_then(Value::as_str) {
                messages.push(ServerMessage::Text(text.to_string()));
            }
        }

        if content.get("turnComplete").and_then(Value::as_bool).unwrap_or(false) {
            messages.push(ServerMessage::TurnComplete);
        }
    }

    if let Some(tool_call) = value.get("toolCall") {
        let call: ToolCall = serde_json::from_value(tool_call.clone())?;
        messages.push(ServerMessage::ToolCall(call));
    }

    if let Some(cancellation) = value.get("toolCallCancellation") {
        let ids = cancellation
            .get("ids")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(|id| id.as_str().map(String::from)).collect())
            .unwrap_or_default();
        messages.push(ServerMessage::ToolCallCancellation(ids));
    }

    if let Some(go_away) = value.get("goAway") {
        let time_left = go_away.get("timeLeft").and_then(Value::as_str).map(String::from);
        messages.push(ServerMessage::GoAway { time_left });
    }

    Ok(messages)
}

// ── Listener events ─────────────────────────────────────────────────────

/// Events delivered to [`LiveEventListener`](crate::client::LiveEventListener)s.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// A session was opened.
    Open,
    /// The session closed.
    Close {
        /// Why, when known.
        reason: Option<String>,
    },
    /// A contained failure (connect, transport or protocol).
    Error(String),
    /// Setup handshake finished.
    SetupComplete,
    /// Chunk of synthesized speech.
    Audio {
        /// Raw PCM bytes.
        data: Bytes,
        /// Mime type.
        mime_type: String,
    },
    /// Model text output.
    Text(String),
    /// Playback must stop; the user interrupted.
    Interrupted,
    /// The model finished its turn.
    TurnComplete,
    /// The model requests function calls.
    ToolCall(ToolCall),
    /// Previously issued calls were cancelled.
    ToolCallCancellation(Vec<String>),
}

impl LiveEvent {
    /// Short event name, e.g. `toolcall`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close { .. } => "close",
            Self::Error(_) => "error",
            Self::SetupComplete => "setupcomplete",
            Self::Audio { .. } => "audio",
            Self::Text(_) => "content",
            Self::Interrupted => "interrupted",
            Self::TurnComplete => "turncomplete",
            Self::ToolCall(_) => "toolcall",
            Self::ToolCallCancellation(_) => "toolcallcancellation",
        }
    }
}
