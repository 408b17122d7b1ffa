//! Runtime configuration: endpoint, models and the API credential.

use crate::error::{ReimagineError, Result};
use std::env;
use std::fmt;

/// Default OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default vision model for the description stage.
pub const DEFAULT_DESCRIPTION_MODEL: &str = "gpt-4o";
/// Default image model for the synthesis stage.
pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
/// Upper bound on the description length, in tokens.
pub const DESCRIPTION_MAX_TOKENS: u32 = 300;
/// Synthesis quality tier. Not user-exposed.
pub const IMAGE_QUALITY: &str = "low";

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["OPENAI_API_KEY", "VITE_OPENAI_API_KEY"];

/// An API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The secret value, for building the authorization header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Where the API key comes from.
///
/// The environment is read on every [`Credentials::resolve`] call, so a key
/// exported after startup is picked up by the next generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Read from the first set, non-empty variable.
    Env(Vec<String>),
    /// Fixed key supplied by the caller.
    Static(ApiKey),
}

impl Default for Credentials {
    fn default() -> Self {
        Self::Env(API_KEY_ENV_VARS.iter().map(|v| v.to_string()).collect())
    }
}

impl Credentials {
    /// Resolves the key, failing with a configuration error when absent.
    pub fn resolve(&self) -> Result<ApiKey> {
        self.resolve_with(|var| env::var(var).ok())
    }

    fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<ApiKey> {
        match self {
            Self::Static(key) if !key.expose().trim().is_empty() => Ok(key.clone()),
            Self::Static(_) => Err(ReimagineError::Config("API key is empty".into())),
            Self::Env(vars) => vars
                .iter()
                .find_map(|var| lookup(var).filter(|v| !v.trim().is_empty()))
                .map(ApiKey::new)
                .ok_or_else(|| {
                    ReimagineError::Config(format!("API key missing (set {})", vars.join(" or ")))
                }),
        }
    }

    /// Returns true when a key can currently be resolved.
    pub fn is_configured(&self) -> bool {
        self.resolve().is_ok()
    }
}

/// Settings shared by both service calls.
#[derive(Debug, Clone)]
pub struct Config {
    /// API root, without the endpoint path.
    pub base_url: String,
    /// Vision model for the description stage.
    pub description_model: String,
    /// Image model for the synthesis stage.
    pub image_model: String,
    /// Where the API key comes from.
    pub credentials: Credentials,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            description_model: DEFAULT_DESCRIPTION_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            credentials: Credentials::default(),
        }
    }
}

impl Config {
    /// Defaults: OpenAI endpoint, `gpt-4o`, `gpt-image-1`, key from the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `REIMAGINE_BASE_URL`, `REIMAGINE_DESCRIPTION_MODEL` and
    /// `REIMAGINE_IMAGE_MODEL`; the key itself stays lazily resolved.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_url = env_or("REIMAGINE_BASE_URL", defaults.base_url);
        let description_model = env_or("REIMAGINE_DESCRIPTION_MODEL", defaults.description_model);
        let image_model = env_or("REIMAGINE_IMAGE_MODEL", defaults.image_model);

        Config {
            base_url,
            description_model,
            image_model,
            credentials: defaults.credentials,
        }
    }

    /// Sets the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the description model.
    pub fn with_description_model(mut self, model: impl Into<String>) -> Self {
        self.description_model = model.into();
        self
    }

    /// Sets the image model.
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Uses a fixed key instead of the environment.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.credentials = Credentials::Static(ApiKey::new(key));
        self
    }

    /// Endpoint for the description stage.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Endpoint for the synthesis stage.
    pub fn image_generations_url(&self) -> String {
        format!("{}/images/generations", self.base_url.trim_end_matches('/'))
    }
}

fn env_or(var: &str, default: String) -> String {
    env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials() {
        let creds = Credentials::Static(ApiKey::new("sk-test"));
        assert_eq!(creds.resolve().unwrap().expose(), "sk-test");

        let empty = Credentials::Static(ApiKey::new("  "));
        assert!(matches!(empty.resolve(), Err(ReimagineError::Config(_))));
    }

    #[test]
    fn test_env_credentials_fall_through_in_order() {
        let creds = Credentials::Env(vec!["PRIMARY_KEY".into(), "FALLBACK_KEY".into()]);

        let key = creds
            .resolve_with(|var| (var == "FALLBACK_KEY").then(|| "sk-fallback".to_string()))
            .unwrap();
        assert_eq!(key.expose(), "sk-fallback");

        let key = creds
            .resolve_with(|var| Some(format!("sk-{}", var.to_lowercase())))
            .unwrap();
        assert_eq!(key.expose(), "sk-primary_key");

        // blank values are skipped
        let key = creds
            .resolve_with(|var| Some(if var == "PRIMARY_KEY" { " " } else { "sk-b" }.into()))
            .unwrap();
        assert_eq!(key.expose(), "sk-b");

        let err = creds.resolve_with(|_| None).unwrap_err();
        assert!(err.to_string().contains("PRIMARY_KEY or FALLBACK_KEY"));
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-secret");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
    }

    #[test]
    fn test_endpoint_urls() {
        let config = Config::new().with_base_url("http://localhost:8080/v1/");
        assert_eq!(
            config.chat_completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(
            config.image_generations_url(),
            "http://localhost:8080/v1/images/generations"
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.description_model, "gpt-4o");
        assert_eq!(config.image_model, "gpt-image-1");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
