use anyhow::{Context, Result};
use mirror_avatar::{AppConfig, LanguagePreset};
use std::path::Path;

/// Resolved CLI configuration.
pub struct Config {
    pub api_key: String,
    pub app: AppConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config").field("app", &self.app).finish_non_exhaustive()
    }
}

impl Config {
    /// Load `.env`, the API key and the app config with command-line
    /// overrides applied.
    pub fn load(path: Option<&Path>, language: Option<&str>, model: Option<&str>) -> Result<Self> {
        if let Ok(file) = dotenvy::dotenv() {
            tracing::debug!(file = %file.display(), "Loaded .env");
        }
        let api_key = api_key_from_env()?;
        let app = app_config(path, language, model)?;
        Ok(Self { api_key, app })
    }
}

pub fn api_key_from_env() -> Result<String> {
    mirror_realtime::api_key_from_env()
        .ok_or_else(|| anyhow::anyhow!(mirror_realtime::auth::missing_api_key_message()))
}

/// App config from `path` (or the built-in defaults) with overrides.
pub fn app_config(path: Option<&Path>, language: Option<&str>, model: Option<&str>) -> Result<AppConfig> {
    let mut app = match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(language) = language {
        let preset: LanguagePreset = language.parse()?;
        app = app.with_language(preset);
    }
    if let Some(model) = model {
        app = app.with_live_model(model);
    }
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let app = app_config(None, None, None).unwrap();
        assert_eq!(app, AppConfig::default());
    }

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"liveModel":"from-file","voice":"Kore"}}"#).unwrap();

        let app = app_config(Some(file.path()), Some("french"), None).unwrap();
        assert_eq!(app.live_model, "from-file");
        assert_eq!(app.voice, "Kore");
        assert_eq!(app.language_code, "fr-FR");

        let app = app_config(Some(file.path()), None, Some("other")).unwrap();
        assert_eq!(app.live_model, "other");
    }

    #[test]
    fn test_bad_inputs() {
        assert!(app_config(None, Some("klingon"), None).is_err());
        assert!(app_config(Some(Path::new("/nonexistent/mirror.json")), None, None).is_err());
    }
}
