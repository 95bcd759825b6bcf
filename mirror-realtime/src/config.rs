//! Configuration types for live sessions.
//!
//! [`LiveConfig`] is provider-neutral; [`LiveConfig::to_setup`] renders the
//! opening `setup` message of the Live API.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Output modality requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    /// Synthesized speech.
    #[default]
    Audio,
    /// Text.
    Text,
}

/// Resolution at which incoming video frames are tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaResolution {
    #[serde(rename = "MEDIA_RESOLUTION_LOW")]
    Low,
    #[serde(rename = "MEDIA_RESOLUTION_MEDIUM")]
    Medium,
    #[serde(rename = "MEDIA_RESOLUTION_HIGH")]
    High,
}

/// Sensitivity when detecting the start of speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartSensitivity {
    #[serde(rename = "START_SENSITIVITY_LOW")]
    Low,
    #[serde(rename = "START_SENSITIVITY_HIGH")]
    High,
}

/// Sensitivity when detecting the end of speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndSensitivity {
    #[serde(rename = "END_SENSITIVITY_LOW")]
    Low,
    #[serde(rename = "END_SENSITIVITY_HIGH")]
    High,
}

/// Server-side voice activity detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomaticActivityDetection {
    /// Turn detection off; the client manages turns.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_of_speech_sensitivity: Option<StartSensitivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_of_speech_sensitivity: Option<EndSensitivity>,
    /// Audio kept before detected speech, in ms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_padding_ms: Option<u32>,
    /// Silence that ends a turn, in ms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_duration_ms: Option<u32>,
}

impl AutomaticActivityDetection {
    /// Low start/end sensitivity with the given padding and silence window.
    pub fn low_sensitivity(prefix_padding_ms: u32, silence_duration_ms: u32) -> Self {
        Self {
            disabled: false,
            start_of_speech_sensitivity: Some(StartSensitivity::Low),
            end_of_speech_sensitivity: Some(EndSensitivity::Low),
            prefix_padding_ms: Some(prefix_padding_ms),
            silence_duration_ms: Some(silence_duration_ms),
        }
    }

    /// Client-managed turns.
    pub fn disabled() -> Self {
        Self { disabled: true, ..Default::default() }
    }
}

/// Realtime input settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatic_activity_detection: Option<AutomaticActivityDetection>,
}

/// Sliding-window context compression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWindowCompression {
    /// Context size that triggers compression.
    pub trigger_tokens: u64,
    /// Size the window is compressed down to.
    pub target_tokens: u64,
}

impl ContextWindowCompression {
    /// Compress from `trigger_tokens` down to `target_tokens`.
    pub fn sliding_window(trigger_tokens: u64, target_tokens: u64) -> Self {
        Self { trigger_tokens, target_tokens }
    }

    fn to_wire(&self) -> Value {
        json!({
            "triggerTokens": self.trigger_tokens.to_string(),
            "slidingWindow": { "targetTokens": self.target_tokens.to_string() },
        })
    }
}

/// Whether the model waits for a function result before continuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FunctionBehavior {
    Blocking,
    /// The model keeps talking while the call runs.
    NonBlocking,
}

/// Function declaration advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Function name.
    pub name: String,
    /// What the function does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<FunctionBehavior>,
}

impl FunctionDeclaration {
    /// Create a declaration with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: None, parameters: None, behavior: None }
    }

    /// Set the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Set the parameters schema.
    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = Some(schema);
        self
    }

    /// Set the calling behavior.
    pub fn with_behavior(mut self, behavior: FunctionBehavior) -> Self {
        self.behavior = Some(behavior);
        self
    }

    fn to_wire(&self) -> Value {
        let mut decl = json!({
            "name": self.name,
            "description": self.description.clone().unwrap_or_default(),
            "parameters": self
                .parameters
                .clone()
                .unwrap_or_else(|| json!({ "type": "object", "properties": {} })),
        });
        if let Some(behavior) = self.behavior {
            decl["behavior"] = json!(behavior);
        }
        decl
    }
}

/// Configuration for a live session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveConfig {
    /// Output modalities; audio when empty.
    #[serde(default)]
    pub response_modalities: Vec<Modality>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_resolution: Option<MediaResolution>,

    /// Prebuilt voice name, e.g. `Aoede`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// BCP-47 language code for speech, e.g. `fr-FR`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,

    /// System instruction for the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_input: Option<RealtimeInputConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window_compression: Option<ContextWindowCompression>,

    /// Grounding with Google Search.
    #[serde(default)]
    pub google_search: bool,

    /// Functions the model may call.
    #[serde(default)]
    pub functions: Vec<FunctionDeclaration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl LiveConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output modalities.
    pub fn with_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.response_modalities = modalities;
        self
    }

    /// Set the media resolution.
    pub fn with_media_resolution(mut self, resolution: MediaResolution) -> Self {
        self.media_resolution = Some(resolution);
        self
    }

    /// Set the voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Set the speech language.
    pub fn with_language_code(mut self, code: impl Into<String>) -> Self {
        self.language_code = Some(code.into());
        self
    }

    /// Set the system instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Set voice activity detection.
    pub fn with_activity_detection(mut self, detection: AutomaticActivityDetection) -> Self {
        self.realtime_input = Some(RealtimeInputConfig {
            automatic_activity_detection: Some(detection),
        });
        self
    }

    /// Set context window compression.
    pub fn with_compression(mut self, compression: ContextWindowCompression) -> Self {
        self.context_window_compression = Some(compression);
        self
    }

    /// Enable Google Search grounding.
    pub fn with_google_search(mut self) -> Self {
        self.google_search = true;
        self
    }

    /// Add a function declaration.
    pub fn with_function(mut self, function: FunctionDeclaration) -> Self {
        self.functions.push(function);
        self
    }

    /// Replace the function declarations.
    pub fn with_functions(mut self, functions: Vec<FunctionDeclaration>) -> Self {
        self.functions = functions;
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Render the `setup` message that opens a session for `model`.
    pub fn to_setup(&self, model: &str) -> Value {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };

        let modalities = if self.response_modalities.is_empty() {
            vec![Modality::Audio]
        } else {
            self.response_modalities.clone()
        };
        let mut generation_config = json!({ "responseModalities": modalities });

        if self.voice.is_some() || self.language_code.is_some() {
            let mut speech = json!({});
            if let Some(voice) = &self.voice {
                speech["voiceConfig"] = json!({ "prebuiltVoiceConfig": { "voiceName": voice } });
            }
            if let Some(code) = &self.language_code {
                speech["languageCode"] = json!(code);
            }
            generation_config["speechConfig"] = speech;
        }
        if let Some(resolution) = self.media_resolution {
            generation_config["mediaResolution"] = json!(resolution);
        }
        if let Some(temp) = self.temperature {
            generation_config["temperature"] = json!(temp);
        }

        let mut setup = json!({ "model": model, "generationConfig": generation_config });

        if let Some(text) = &self.system_instruction {
            setup["systemInstruction"] = json!({ "parts": [{ "text": text }] });
        }
        if let Some(input) = &self.realtime_input {
            setup["realtimeInputConfig"] = json!(input);
        }
        if let Some(compression) = &self.context_window_compression {
            setup["contextWindowCompression"] = compression.to_wire();
        }

        let mut tools = Vec::new();
        if self.google_search {
            tools.push(json!({ "googleSearch": {} }));
        }
        if !self.functions.is_empty() {
            let declarations: Vec<Value> =
                self.functions.iter().map(FunctionDeclaration::to_wire).collect();
            tools.push(json!({ "functionDeclarations": declarations }));
        }
        if !tools.is_empty() {
            setup["tools"] = Value::Array(tools);
        }

        json!({ "setup": setup })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_setup_defaults_to_audio() {
        let setup = LiveConfig::new().to_setup("gemini-live");
        assert_eq!(setup["setup"]["model"], "models/gemini-live");
        assert_eq!(setup["setup"]["generationConfig"]["responseModalities"], json!(["AUDIO"]));
        assert!(setup["setup"].get("tools").is_none());
        assert!(setup["setup"].get("systemInstruction").is_none());
    }

    #[test]
    fn test_full_setup_wire_format() {
        let config = LiveConfig::new()
            .with_media_resolution(MediaResolution::Medium)
            .with_voice("Aoede")
            .with_language_code("fr-FR")
            .with_instruction("Tu es un miroir magique.")
            .with_activity_detection(AutomaticActivityDetection::low_sensitivity(20, 100))
            .with_compression(ContextWindowCompression::sliding_window(25_600, 12_800))
            .with_google_search()
            .with_function(
                FunctionDeclaration::new("stop_music")
                    .with_description("Stop the music")
                    .with_behavior(FunctionBehavior::NonBlocking),
            );

        let setup = &config.to_setup("models/x")["setup"];
        assert_eq!(setup["model"], "models/x");
        assert_eq!(setup["generationConfig"]["mediaResolution"], "MEDIA_RESOLUTION_MEDIUM");
        assert_eq!(
            setup["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Aoede"
        );
        assert_eq!(setup["generationConfig"]["speechConfig"]["languageCode"], "fr-FR");
        assert_eq!(setup["systemInstruction"]["parts"][0]["text"], "Tu es un miroir magique.");

        let detection = &setup["realtimeInputConfig"]["automaticActivityDetection"];
        assert_eq!(detection["startOfSpeechSensitivity"], "START_SENSITIVITY_LOW");
        assert_eq!(detection["endOfSpeechSensitivity"], "END_SENSITIVITY_LOW");
        assert_eq!(detection["prefixPaddingMs"], 20);
        assert_eq!(detection["silenceDurationMs"], 100);
        assert!(detection.get("disabled").is_none());

        assert_eq!(setup["contextWindowCompression"]["triggerTokens"], "25600");
        assert_eq!(setup["contextWindowCompression"]["slidingWindow"]["targetTokens"], "12800");

        assert_eq!(setup["tools"][0], json!({ "googleSearch": {} }));
        let decl = &setup["tools"][1]["functionDeclarations"][0];
        assert_eq!(decl["name"], "stop_music");
        assert_eq!(decl["behavior"], "NON_BLOCKING");
        assert_eq!(decl["parameters"]["type"], "object");
    }

    #[test]
    fn test_disabled_detection() {
        let config = LiveConfig::new().with_activity_detection(AutomaticActivityDetection::disabled());
        let setup = config.to_setup("m");
        assert_eq!(
            setup["setup"]["realtimeInputConfig"]["automaticActivityDetection"]["disabled"],
            true
        );
    }
}
