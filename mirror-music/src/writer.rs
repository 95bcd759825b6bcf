//! Prompt writer backed by the Gemini `generateContent` REST endpoint.
//!
//! The request asks for JSON constrained by [`prompt_schema`]; the first
//! text part of the first candidate is parsed with [`parse_prompts`].

use crate::error::{MusicError, Result};
use crate::prompts::{MusicPromptWriter, WeightedPrompt, parse_prompts, prompt_instruction, prompt_schema};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};

/// REST base URL for text generation.
pub const GENERATIVE_LANGUAGE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Expands free-form music requests into weighted prompts with a hosted
/// text model.
pub struct GeminiPromptWriter {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: url::Url,
}

impl GeminiPromptWriter {
    /// Create a writer for the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let base_url = url::Url::parse(GENERATIVE_LANGUAGE_URL)
            .map_err(|e| MusicError::config(format!("Invalid base URL: {}", e)))?;
        Ok(Self { http: reqwest::Client::new(), api_key: SecretString::from(api_key.into()), base_url })
    }

    /// Read the API key from the environment.
    pub fn from_env() -> Result<Self> {
        let key = mirror_realtime::api_key_from_env()
            .ok_or_else(|| MusicError::config(mirror_realtime::auth::missing_api_key_message()))?;
        Self::new(key)
    }

    /// Override the REST base URL.
    pub fn with_base_url(mut self, base_url: url::Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub(crate) fn endpoint(&self, model: &str) -> Result<url::Url> {
        let suffix = format!("models/{}:generateContent", model.trim_start_matches("models/"));
        self.base_url
            .join(&suffix)
            .map_err(|e| MusicError::config(format!("Invalid prompt model {}: {}", model, e)))
    }

    fn headers(&self) -> Result<HeaderMap> {
        let key = HeaderValue::from_str(self.api_key.expose_secret())
            .map_err(|e| MusicError::config(format!("Invalid API key: {}", e)))?;
        Ok(HeaderMap::from_iter([(HeaderName::from_static("x-goog-api-key"), key)]))
    }
}

impl std::fmt::Debug for GeminiPromptWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiPromptWriter").field("base_url", &self.base_url.as_str()).finish()
    }
}

#[async_trait]
impl MusicPromptWriter for GeminiPromptWriter {
    async fn write_prompts(&self, request: &str, model: &str) -> Result<Vec<WeightedPrompt>> {
        let url = self.endpoint(model)?;
        let response = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(&prompt_request(request))
            .send()
            .await
            .map_err(|e| MusicError::prompt(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let description = response.text().await.unwrap_or_default();
            return Err(MusicError::prompt(format!("{}: {}", status.as_u16(), description)));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| MusicError::prompt(format!("Undecodable response: {}", e)))?;
        let prompts = prompts_from_response(&body)?;
        tracing::debug!(count = prompts.len(), %model, "Music prompts written");
        Ok(prompts)
    }
}

/// Request body asking the model for a JSON prompt list.
pub fn prompt_request(request: &str) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt_instruction(request) }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": prompt_schema()
        }
    })
}

/// The part of a `generateContent` reply the writer reads.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Default, Deserialize)]
struct TextPart {
    text: Option<String>,
}

/// Prompts from the first text part of the first candidate.
pub fn prompts_from_response(response: &GenerateContentResponse) -> Result<Vec<WeightedPrompt>> {
    let text = response
        .candidates
        .first()
        .and_then(|c| c.content.parts.iter().find_map(|p| p.text.as_deref()))
        .ok_or_else(|| MusicError::prompt("Response has no text"))?;
    parse_prompts(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_instruction_and_schema() {
        let body = prompt_request("calm rain");
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.contains("User request: \"calm rain\""));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"], prompt_schema());
    }

    #[test]
    fn test_endpoint_strips_models_prefix() {
        let writer = GeminiPromptWriter::new("sekrit-123").unwrap();
        let url = writer.endpoint("models/gemini-2.5-flash-lite").unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
        assert!(!format!("{:?}", writer).contains("sekrit"));
    }

    #[test]
    fn test_prompts_from_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "[{\"text\":\"Cello\",\"weight\":0.5},{\"text\":\"Rain\"}]" }] }
            }]
        }))
        .unwrap();
        let prompts = prompts_from_response(&response).unwrap();
        assert_eq!(prompts, vec![WeightedPrompt::new("Cello").with_weight(0.5), WeightedPrompt::new("Rain")]);
    }

    #[test]
    fn test_empty_response_is_an_error() {
        let response = GenerateContentResponse::default();
        assert!(matches!(prompts_from_response(&response), Err(MusicError::PromptError(_))));
    }
}
