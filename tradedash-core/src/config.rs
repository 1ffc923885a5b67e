//! Client configuration.
//!
//! Resolution order (later wins): built-in defaults, `config.toml` in the
//! user config directory, a `.env` file, then process environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:4000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "TRADEDASH_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "TRADEDASH_TIMEOUT_SECS";
pub const ENV_SESSION_PATH: &str = "TRADEDASH_SESSION_PATH";
pub const ENV_LOG: &str = "TRADEDASH_LOG";

/// Directory under the platform config dir holding all TradeDash files.
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tradedash")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub session_path: PathBuf,
    /// `tracing` filter directive, e.g. `warn` or `tradedash_core=debug`.
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_path: app_dir().join("session.json"),
            log_filter: "warn".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load with the full layering: defaults → TOML file → `.env` → env vars.
    pub fn load() -> Result<Self, ApiError> {
        let _ = dotenvy::dotenv();
        let file = app_dir().join("config.toml");
        let mut config = if file.exists() {
            Self::from_file(&file)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ApiError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ApiError> {
        toml::from_str(content).map_err(|e| ApiError::Config(format!("parse config TOML: {e}")))
    }

    /// Overlay values from an environment lookup. Takes a closure so tests
    /// don't have to mutate the real process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = raw.trim().parse().map_err(|_| {
                ApiError::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number, got '{raw}'"))
            })?;
        }
        if let Some(path) = lookup(ENV_SESSION_PATH) {
            self.session_path = PathBuf::from(path);
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        Ok(())
    }

    /// Normalize and check the base URL.
    pub fn validate(&mut self) -> Result<(), ApiError> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ApiError::Config("timeout must be at least 1 second".into()));
        }
        self.base_url = trimmed;
        Ok(())
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let mut config = ClientConfig::default();
        config.validate().unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let config = ClientConfig::from_toml_str(r#"base_url = "https://api.example.com/v1""#).unwrap();
        assert_eq!(config.base_url, "https://api.example.com/v1");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn env_wins_over_file() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "https://prod.example.com/api/"),
            (ENV_TIMEOUT_SECS, "5"),
        ]
        .into_iter()
        .collect();
        let mut config = ClientConfig::from_toml_str(r#"base_url = "http://file/api""#).unwrap();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        config.validate().unwrap();
        assert_eq!(config.base_url, "https://prod.example.com/api");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = ClientConfig::default().with_base_url("localhost:4000");
        assert!(matches!(config.validate(), Err(ApiError::Config(_))));

        let mut config = ClientConfig::default();
        let result = config.apply_env(|k| (k == ENV_TIMEOUT_SECS).then(|| "soon".to_string()));
        assert!(result.is_err());
    }
}
