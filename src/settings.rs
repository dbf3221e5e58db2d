use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_TIMEOUT;
use crate::error::AppError;

const SETTINGS_FILENAME: &str = "settings.json";
pub const API_BASE_ENV: &str = "VOICEGEN_API_BASE";
const HOME_ENV: &str = "VOICEGEN_HOME";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "deserialize_optional_url")]
    pub api_base: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: None,
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        if self.request_timeout_secs == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_secs(self.request_timeout_secs)
        }
    }
}

fn deserialize_optional_url<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(normalize_optional))
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Picks the API base URL: the environment wins over the settings file.
pub fn resolve_api_base(env_value: Option<&str>, settings: &Settings) -> Result<String, AppError> {
    let candidate = env_value
        .and_then(normalize_optional)
        .or_else(|| settings.api_base.clone())
        .ok_or(AppError::MissingApiBase)?;
    let url = Url::parse(&candidate).map_err(|err| AppError::InvalidApiBase {
        url: candidate.clone(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::InvalidApiBase {
            url: candidate,
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(candidate)
}

pub fn api_base_from_env() -> Option<String> {
    env::var(API_BASE_ENV).ok()
}

pub fn load_settings() -> Settings {
    match load_settings_from_path(None) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("Using default settings: {err:#}");
            Settings::default()
        }
    }
}

pub fn load_settings_from_path(custom_path: Option<&Path>) -> Result<Settings> {
    let settings_path = custom_path
        .map(Path::to_owned)
        .unwrap_or_else(default_settings_path);

    match fs::read_to_string(&settings_path) {
        Ok(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in {}", settings_path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(err) => Err(err).with_context(|| format!("Failed reading {}", settings_path.display())),
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to_path(settings, &default_settings_path())
}

pub fn save_settings_to_path(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed creating {}", parent.display()))?;
    }
    let payload =
        serde_json::to_string_pretty(settings).context("Failed serializing settings to JSON")?;
    fs::write(path, payload).with_context(|| format!("Failed writing {}", path.display()))
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join(SETTINGS_FILENAME)
}

pub fn config_dir() -> PathBuf {
    if let Ok(custom) = env::var(HOME_ENV) {
        let path = PathBuf::from(custom);
        if path.is_absolute() {
            return path;
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".voicegen")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(Some(&dir.path().join("nope.json"))).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.request_timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);
        let settings = Settings {
            api_base: Some("http://localhost:8000".into()),
            request_timeout_secs: 30,
        };
        save_settings_to_path(&settings, &path).unwrap();
        assert_eq!(load_settings_from_path(Some(&path)).unwrap(), settings);
    }

    #[test]
    fn blank_fields_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, r#"{"api_base": "   ", "request_timeout_secs": 0}"#).unwrap();
        let settings = load_settings_from_path(Some(&path)).unwrap();
        assert_eq!(settings.api_base, None);
        assert_eq!(settings.request_timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "{ api_base").unwrap();
        assert!(load_settings_from_path(Some(&path)).is_err());
    }

    #[test]
    fn env_overrides_settings_file() {
        let settings = Settings {
            api_base: Some("http://from-file:8000".into()),
            ..Settings::default()
        };
        assert_eq!(
            resolve_api_base(Some("https://from-env.example/ "), &settings).unwrap(),
            "https://from-env.example"
        );
        assert_eq!(
            resolve_api_base(Some(""), &settings).unwrap(),
            "http://from-file:8000"
        );
        assert_eq!(
            resolve_api_base(None, &settings).unwrap(),
            "http://from-file:8000"
        );
    }

    #[test]
    fn api_base_must_be_an_http_url() {
        let settings = Settings::default();
        assert!(matches!(
            resolve_api_base(None, &settings),
            Err(AppError::MissingApiBase)
        ));
        assert!(matches!(
            resolve_api_base(Some("not a url"), &settings),
            Err(AppError::InvalidApiBase { .. })
        ));
        assert!(matches!(
            resolve_api_base(Some("ftp://voices.example"), &settings),
            Err(AppError::InvalidApiBase { .. })
        ));
    }
}
