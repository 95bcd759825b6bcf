//! Application config for the avatar.
//!
//! Loaded from a camelCase JSON document; every field has a default so a
//! partial file (or none at all) still yields a working mirror.
//!
//! ```json
//! {
//!   "liveModel": "models/gemini-2.5-flash-live-preview",
//!   "systemInstructions": { "en-US": "You are a magic mirror.", "fr-FR": "Tu es un miroir magique." },
//!   "music": { "accompany": true },
//!   "camera": { "orientation": "vertical" }
//! }
//! ```

use crate::camera::Orientation;
use crate::error::{AvatarError, Result};
use mirror_realtime::{
    AutomaticActivityDetection, ContextWindowCompression, FunctionBehavior, FunctionDeclaration,
    LiveConfig, MediaResolution, Modality,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Live model used when none is configured.
pub const DEFAULT_LIVE_MODEL: &str = "models/gemini-2.5-flash-live-preview";

/// Language used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Prebuilt voice of the avatar.
pub const DEFAULT_VOICE: &str = "Aoede";

pub const DEFAULT_IMAGE_EDIT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Silence (ms) after which the avatar counts as done talking.
pub const DEFAULT_END_OF_SPEECH_GRACE_PERIOD_MS: u64 = 2000;

/// Voice activity detection: prefix padding and trailing silence, in ms.
const VAD_PREFIX_PADDING_MS: u32 = 20;
const VAD_SILENCE_DURATION_MS: u32 = 100;

/// Context window compression thresholds, in tokens.
const COMPRESSION_TRIGGER_TOKENS: u64 = 25_600;
const COMPRESSION_TARGET_TOKENS: u64 = 12_800;

/// Named language presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguagePreset {
    French,
    English,
}

impl LanguagePreset {
    /// Speech language code of the preset.
    pub fn language_code(&self) -> &'static str {
        match self {
            Self::French => "fr-FR",
            Self::English => "en-US",
        }
    }
}

impl FromStr for LanguagePreset {
    type Err = AvatarError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "french" | "fr" | "fr-fr" => Ok(Self::French),
            "english" | "en" | "en-us" => Ok(Self::English),
            other => Err(AvatarError::config(format!("Unknown language preset: {}", other))),
        }
    }
}

/// Music accompaniment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MusicSettings {
    /// Start matching music whenever an image tool runs.
    pub accompany: bool,
    /// Model that turns requests into weighted prompts.
    pub prompt_model: String,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self { accompany: false, prompt_model: mirror_music::DEFAULT_PROMPT_MODEL.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraSettings {
    pub orientation: Orientation,
}

/// Connect (and optionally start the camera) at launch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoStart {
    pub enabled: bool,
    pub with_camera: bool,
}

/// Avatar application config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Live model for the conversation.
    pub live_model: String,
    /// Model used by the image chats.
    pub image_edit_model: String,
    /// System instruction per language code.
    pub system_instructions: BTreeMap<String, String>,
    /// Speech language code.
    pub language_code: String,
    pub voice: String,
    /// Tools offered to the model, keyed by tool name.
    pub tools: BTreeMap<String, FunctionDeclaration>,
    /// Edit instruction; `${prompt}` is replaced.
    pub edit_image_prompt_template: String,
    /// Disguise instruction; `${disguise_character}` is replaced.
    pub disguise_prompt_template: String,
    /// Music request for an edit; `${prompt}` is replaced.
    pub edit_image_music_prompt_template: String,
    /// Music request for a disguise; `${disguise_character}` is replaced.
    pub disguise_music_prompt_template: String,
    pub music: MusicSettings,
    pub camera: CameraSettings,
    pub auto_start: AutoStart,
    pub end_of_speech_grace_period_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut system_instructions = BTreeMap::new();
        system_instructions.insert(
            "en-US".to_string(),
            "You are a magic mirror on the wall. Speak in a warm, theatrical voice, keep answers \
             short, and use your tools to disguise the visitor, edit the picture, illustrate \
             stories and play music."
                .to_string(),
        );
        system_instructions.insert(
            "fr-FR".to_string(),
            "Tu es un miroir magique. Parle d'une voix chaleureuse et théâtrale, réponds \
             brièvement et utilise tes outils pour déguiser le visiteur, retoucher l'image, \
             illustrer des histoires et jouer de la musique."
                .to_string(),
        );

        Self {
            live_model: DEFAULT_LIVE_MODEL.to_string(),
            image_edit_model: DEFAULT_IMAGE_EDIT_MODEL.to_string(),
            system_instructions,
            language_code: DEFAULT_LANGUAGE.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            tools: default_tools(),
            edit_image_prompt_template: "Edit the previous image: ${prompt}. Keep the same \
                                         person, framing and art style."
                .to_string(),
            disguise_prompt_template: "Transform the person in this photo into \
                                       ${disguise_character}. Keep their pose and facial \
                                       features recognizable."
                .to_string(),
            edit_image_music_prompt_template: "Background music matching this scene: ${prompt}"
                .to_string(),
            disguise_music_prompt_template: "Theme music for ${disguise_character}".to_string(),
            music: MusicSettings::default(),
            camera: CameraSettings::default(),
            auto_start: AutoStart::default(),
            end_of_speech_grace_period_ms: DEFAULT_END_OF_SPEECH_GRACE_PERIOD_MS,
        }
    }
}

fn string_param(name: &str, description: &str) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    properties.insert(name.to_string(), json!({ "type": "string", "description": description }));
    json!({ "type": "object", "properties": properties, "required": [name] })
}

fn default_tools() -> BTreeMap<String, FunctionDeclaration> {
    let tools = [
        FunctionDeclaration::new(crate::tools::DISGUISE_CAMERA_IMAGE)
            .with_description("Take a picture of the visitor and disguise them as a character.")
            .with_parameters(string_param(
                "disguise_character",
                "Who or what to disguise the visitor as.",
            )),
        FunctionDeclaration::new(crate::tools::EDIT_IMAGE)
            .with_description("Edit the image currently shown in the mirror.")
            .with_parameters(string_param("prompt", "The change to make.")),
        FunctionDeclaration::new(crate::tools::CLEAR_IMAGE)
            .with_description("Remove every image from the mirror."),
        FunctionDeclaration::new(crate::tools::GENERATE_STORY_IMAGE)
            .with_description("Illustrate the current moment of a story.")
            .with_parameters(string_param("prompt", "Description of the scene.")),
        FunctionDeclaration::new(crate::tools::PLAY_MUSIC)
            .with_description("Play generated background music.")
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "prompt": { "type": "string", "description": "The music to play." },
                    "modelName": { "type": "string", "description": "Optional prompt model." },
                },
                "required": ["prompt"],
            })),
        FunctionDeclaration::new(crate::tools::STOP_MUSIC).with_description("Stop the music."),
    ];
    tools.into_iter().map(|t| (t.name.clone(), t)).collect()
}

impl AppConfig {
    /// Parse a JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AvatarError::config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&raw)?;
        tracing::debug!(path = %path.display(), "Loaded app config");
        Ok(config)
    }

    /// Switch the speech language (builder style).
    pub fn with_language(mut self, preset: LanguagePreset) -> Self {
        self.language_code = preset.language_code().to_string();
        self
    }

    /// Override the live model.
    pub fn with_live_model(mut self, model: impl Into<String>) -> Self {
        self.live_model = model.into();
        self
    }

    /// System instruction for the configured language, falling back to
    /// `en-US`, then to empty.
    pub fn system_instruction(&self) -> &str {
        self.system_instructions
            .get(&self.language_code)
            .or_else(|| self.system_instructions.get(DEFAULT_LANGUAGE))
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Declared tools, marked non-blocking so the avatar keeps talking
    /// while they run.
    pub fn function_declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools
            .values()
            .cloned()
            .map(|decl| decl.with_behavior(FunctionBehavior::NonBlocking))
            .collect()
    }

    /// Live session config for the current language.
    pub fn live_config(&self) -> LiveConfig {
        LiveConfig::new()
            .with_modalities(vec![Modality::Audio])
            .with_media_resolution(MediaResolution::Medium)
            .with_activity_detection(AutomaticActivityDetection::low_sensitivity(
                VAD_PREFIX_PADDING_MS,
                VAD_SILENCE_DURATION_MS,
            ))
            .with_compression(ContextWindowCompression::sliding_window(
                COMPRESSION_TRIGGER_TOKENS,
                COMPRESSION_TARGET_TOKENS,
            ))
            .with_voice(&self.voice)
            .with_language_code(&self.language_code)
            .with_instruction(self.system_instruction())
            .with_google_search()
            .with_functions(self.function_declarations())
    }

    pub fn edit_image_prompt(&self, prompt: &str) -> String {
        fill_template(&self.edit_image_prompt_template, "prompt", prompt)
    }

    pub fn disguise_prompt(&self, character: &str) -> String {
        fill_template(&self.disguise_prompt_template, "disguise_character", character)
    }

    pub fn edit_image_music_prompt(&self, prompt: &str) -> String {
        fill_template(&self.edit_image_music_prompt_template, "prompt", prompt)
    }

    pub fn disguise_music_prompt(&self, character: &str) -> String {
        fill_template(&self.disguise_music_prompt_template, "disguise_character", character)
    }
}

/// Replace the first `${key}` in `template` with `value`.
pub fn fill_template(template: &str, key: &str, value: &str) -> String {
    template.replacen(&format!("${{{}}}", key), value, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AppConfig::from_json(
            r#"{"imageEditModel":"img-model","music":{"accompany":true},"camera":{"orientation":"vertical"}}"#,
        )
        .unwrap();
        assert_eq!(config.image_edit_model, "img-model");
        assert!(config.music.accompany);
        assert_eq!(config.music.prompt_model, mirror_music::DEFAULT_PROMPT_MODEL);
        assert_eq!(config.camera.orientation, Orientation::Vertical);
        assert_eq!(config.voice, "Aoede");
        assert_eq!(config.end_of_speech_grace_period_ms, 2000);
        assert_eq!(config.tools.len(), 6);
    }

    #[test]
    fn test_system_instruction_fallback() {
        let mut config = AppConfig::default();
        config.system_instructions.clear();
        config.system_instructions.insert("en-US".into(), "english".into());

        config.language_code = "fr-FR".into();
        assert_eq!(config.system_instruction(), "english");

        config.system_instructions.insert("fr-FR".into(), "français".into());
        assert_eq!(config.system_instruction(), "français");

        config.system_instructions.clear();
        assert_eq!(config.system_instruction(), "");
    }

    #[test]
    fn test_language_presets() {
        let config = AppConfig::default().with_language("french".parse().unwrap());
        assert_eq!(config.language_code, "fr-FR");
        assert_eq!("English".parse::<LanguagePreset>().unwrap(), LanguagePreset::English);
        assert!("klingon".parse::<LanguagePreset>().is_err());
    }

    #[test]
    fn test_live_config() {
        let config = AppConfig::default().with_language(LanguagePreset::French);
        let live = config.live_config();
        assert_eq!(live.response_modalities, vec![Modality::Audio]);
        assert_eq!(live.media_resolution, Some(MediaResolution::Medium));
        assert_eq!(live.voice.as_deref(), Some("Aoede"));
        assert_eq!(live.language_code.as_deref(), Some("fr-FR"));
        assert!(live.google_search);
        assert_eq!(
            live.context_window_compression,
            Some(ContextWindowCompression::sliding_window(25_600, 12_800))
        );
        let detection =
            live.realtime_input.and_then(|r| r.automatic_activity_detection).unwrap();
        assert_eq!(detection.prefix_padding_ms, Some(20));
        assert_eq!(detection.silence_duration_ms, Some(100));
        assert_eq!(live.functions.len(), 6);
        assert!(live.functions.iter().all(|f| f.behavior == Some(FunctionBehavior::NonBlocking)));
    }

    #[test]
    fn test_templates() {
        let config = AppConfig {
            disguise_prompt_template: "Make them ${disguise_character}!".into(),
            edit_image_prompt_template: "${prompt}".into(),
            ..Default::default()
        };
        assert_eq!(config.disguise_prompt("a pirate"), "Make them a pirate!");
        assert_eq!(config.edit_image_prompt("add a hat"), "add a hat");
        assert_eq!(fill_template("no placeholder", "prompt", "x"), "no placeholder");
    }
}
