//! Weighted prompts and hosted prompt synthesis.

use crate::error::{MusicError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Lowest weight the music model accepts.
pub const MIN_WEIGHT: f32 = 0.1;
/// Highest weight the music model accepts.
pub const MAX_WEIGHT: f32 = 2.0;

/// Model used to turn a free-form request into weighted prompts.
pub const DEFAULT_PROMPT_MODEL: &str = "gemini-2.5-flash-lite";

/// One steering prompt for the music model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPrompt {
    /// Instrument, genre or mood, in English.
    pub text: String,
    /// Relative influence, 0.1 to 2.0.
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

impl WeightedPrompt {
    /// A prompt with weight 1.0.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), weight: default_weight() }
    }

    /// Set the weight, clamped to the accepted range.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight.clamp(MIN_WEIGHT, MAX_WEIGHT);
        self
    }
}

/// Turns a free-form request ("something jazzy") into weighted prompts.
///
/// Implementations call a hosted text model; the player treats them as a
/// black box.
#[async_trait]
pub trait MusicPromptWriter: Send + Sync {
    /// Produce prompts for `request` using `model`.
    async fn write_prompts(&self, request: &str, model: &str) -> Result<Vec<WeightedPrompt>>;
}

/// Instruction sent to the prompt model for `request`.
pub fn prompt_instruction(request: &str) -> String {
    format!(
        "Based on the following user request, generate a list of 2 to 5 diverse and creative \
         musical prompts for a music generation model. The model has a vast knowledge of \
         instruments, genres, and moods.\n\nUser request: \"{}\"",
        request
    )
}

/// JSON schema the prompt model must answer with.
pub fn prompt_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "text": {
                    "type": "STRING",
                    "description": "A musical prompt for Lyria, such as an instrument, genre, or mood. Should be in English."
                },
                "weight": {
                    "type": "NUMBER",
                    "description": "The weight for the prompt, from 0.1 to 2.0. Default is 1.0."
                }
            },
            "required": ["text"]
        }
    })
}

/// Parse the prompt model's JSON answer, clamping weights and dropping
/// blank prompts.
pub fn parse_prompts(raw: &str) -> Result<Vec<WeightedPrompt>> {
    let prompts: Vec<WeightedPrompt> = serde_json::from_str(raw.trim())
        .map_err(|e| MusicError::prompt(format!("Unparseable prompt list: {}", e)))?;
    Ok(prompts
        .into_iter()
        .filter(|p| !p.text.trim().is_empty())
        .map(|p| {
            let weight = p.weight;
            p.with_weight(weight)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weight() {
        let prompt: WeightedPrompt = serde_json::from_str(r#"{"text":"Piano"}"#).unwrap();
        assert_eq!(prompt, WeightedPrompt::new("Piano"));
    }

    #[test]
    fn test_weight_clamped() {
        assert_eq!(WeightedPrompt::new("a").with_weight(5.0).weight, MAX_WEIGHT);
        assert_eq!(WeightedPrompt::new("a").with_weight(0.0).weight, MIN_WEIGHT);
    }

    #[test]
    fn test_parse_prompts() {
        let prompts =
            parse_prompts(r#" [{"text":"Jazz","weight":1.5},{"text":"  "},{"text":"Drums","weight":9}] "#)
                .unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].weight, 1.5);
        assert_eq!(prompts[1].weight, MAX_WEIGHT);
    }

    #[test]
    fn test_parse_prompts_rejects_garbage() {
        assert!(matches!(parse_prompts("no"), Err(MusicError::PromptError(_))));
    }

    #[test]
    fn test_instruction_quotes_request() {
        assert!(prompt_instruction("calm rain").contains("User request: \"calm rain\""));
    }
}
