//! API key lookup and TLS setup shared by the hosted model clients.

/// Environment variables that may hold the API key, in lookup order.
pub const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// The first non-empty API key among [`API_KEY_VARS`].
pub fn api_key_from_env() -> Option<String> {
    api_key_from(|var| std::env::var(var).ok())
}

fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS.iter().find_map(|var| lookup(var).filter(|v| !v.is_empty()))
}

/// Message for when no API key is set.
pub fn missing_api_key_message() -> String {
    format!("No API key found; set one of {}", API_KEY_VARS.join(", "))
}

/// Install the process-wide rustls crypto provider once.
#[cfg(feature = "gemini")]
pub fn ensure_crypto_provider() {
    static INSTALL: std::sync::Once = std::sync::Once::new();
    INSTALL.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}
