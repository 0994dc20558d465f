// Import necessary libraries and modules for file I/O and serialization.
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_SETTINGS_PATH: &str = "./data/settings.json";

// Process bootstrap settings: the store, the generator and the HTTP listener.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>, // Alternative OpenAI-compatible endpoint.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub generation_timeout_secs: u64, // Upper bound for a single generator call.
    pub context_window: usize,        // Trailing history entries forwarded to the generator.
    pub redis_url: String,
    pub key_prefix: String,
    pub session_secret: Option<String>, // Key used to derive session identifiers.
    pub bind_addr: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            openai_api_key: None,
            openai_base_url: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.8,
            max_tokens: 500,
            generation_timeout_secs: 30,
            context_window: 3,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "cryptogame:session:".to_string(),
            session_secret: None,
            bind_addr: "0.0.0.0:8000".to_string(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    // Load settings from the configured file (if any) and apply environment overrides.
    pub fn load() -> Result<Self, AppError> {
        let path = std::env::var("CRYPTOGAME_SETTINGS")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_PATH));

        let mut settings = if path.exists() {
            Self::load_settings_from_file(&path)?
        } else {
            Self::default()
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_settings_from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let data = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&data)?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), AppError> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(data.as_bytes())?;
        Ok(())
    }

    /// Overlays environment values on top of the current settings. The lookup is
    /// injected so tests don't have to touch the process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), AppError> {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.openai_base_url = Some(url);
        }
        if let Some(model) = lookup("CRYPTOGAME_MODEL") {
            self.model = model;
        }
        if let Some(secs) = lookup("CRYPTOGAME_GENERATION_TIMEOUT_SECS") {
            self.generation_timeout_secs = secs.trim().parse().map_err(|_| {
                AppError::Config(format!("CRYPTOGAME_GENERATION_TIMEOUT_SECS is not a number: {secs}"))
            })?;
        }

        if let Some(url) = lookup("REDIS_URL") {
            self.redis_url = url;
        } else if let Some(host) = lookup("REDIS_HOST") {
            let port = lookup("REDIS_PORT").unwrap_or_else(|| "6379".to_string());
            self.redis_url = match lookup("REDIS_PASSWORD") {
                Some(password) if !password.is_empty() => {
                    format!("redis://:{password}@{host}:{port}")
                }
                _ => format!("redis://{host}:{port}"),
            };
        }

        if let Some(secret) = lookup("CRYPTOGAME_SESSION_SECRET") {
            self.session_secret = Some(secret);
        }
        if let Some(addr) = lookup("CRYPTOGAME_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(level) = lookup("CRYPTOGAME_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(file) = lookup("CRYPTOGAME_LOG_FILE") {
            self.log_file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.generation_timeout_secs == 0 {
            return Err(AppError::Config(
                "generation_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.context_window == 0 {
            return Err(AppError::Config(
                "context_window must be greater than zero".to_string(),
            ));
        }
        if self.key_prefix.is_empty() {
            return Err(AppError::Config("key_prefix must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_redis_url_from_host_parts() {
        let vars = env(&[
            ("REDIS_HOST", "cache.internal"),
            ("REDIS_PORT", "6380"),
            ("REDIS_PASSWORD", "hunter2"),
        ]);
        let mut settings = Settings::default();
        settings.apply_env(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(settings.redis_url, "redis://:hunter2@cache.internal:6380");
    }

    #[test]
    fn test_redis_url_wins_over_host_parts() {
        let vars = env(&[
            ("REDIS_URL", "redis://primary:6379"),
            ("REDIS_HOST", "ignored"),
        ]);
        let mut settings = Settings::default();
        settings.apply_env(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(settings.redis_url, "redis://primary:6379");
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let vars = env(&[("CRYPTOGAME_GENERATION_TIMEOUT_SECS", "soon")]);
        let mut settings = Settings::default();
        assert!(matches!(
            settings.apply_env(|k| vars.get(k).cloned()),
            Err(AppError::Config(_))
        ));

        settings.generation_timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::new();
        settings.model = "gpt-4o".to_string();
        settings.context_window = 5;
        settings.save_to_file(&path).unwrap();

        let loaded = Settings::load_settings_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_settings_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"model": "gpt-4.1-mini"}"#).unwrap();

        let loaded = Settings::load_settings_from_file(&path).unwrap();
        assert_eq!(loaded.model, "gpt-4.1-mini");
        assert_eq!(loaded.context_window, 3);
        assert_eq!(loaded.generation_timeout(), Duration::from_secs(30));
    }
}
