//! Module for accessing, saving, and loading configuration files.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::APP_NAME;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the coaching backend.
    #[serde(
        default = "default_api_base_url",
        skip_serializing_if = "Config::is_default_api_base_url"
    )]
    api_base_url: String,

    /// Preferred input device name. Absent means the platform default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    device: Option<String>,

    /// Preferred language hint passed along with uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,

    /// Discard recordings under a certain duration, in seconds
    #[serde(
        default = "default_discard_under_secs",
        skip_serializing_if = "Config::is_default_discard_under_secs"
    )]
    discard_under_secs: f32,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_owned()
}

fn default_discard_under_secs() -> f32 {
    0.5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            device: None,
            language: None,
            discard_under_secs: default_discard_under_secs(),
        }
    }
}

impl Config {
    /// Base URL of the coaching backend, without a trailing slash.
    pub fn api_base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn set_api_base_url(&mut self, url: &str) {
        self.api_base_url = url.to_owned();
    }

    /// Preferred input device name, if configured.
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Preferred language hint.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Discard recordings under a certain duration
    pub fn discard_under(&self) -> Duration {
        Duration::from_secs_f32(self.discard_under_secs)
    }

    fn is_default_api_base_url(url: &String) -> bool {
        url == DEFAULT_API_BASE_URL
    }

    fn is_default_discard_under_secs(secs: &f32) -> bool {
        secs == &default_discard_under_secs()
    }
}

/// Manages loading, saving, and reloading the configuration.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new `ConfigManager` with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a new `ConfigManager` with a specified configuration directory.
    /// Useful for testing with temporary directories.
    #[cfg(test)]
    pub fn with_config_dir<P: AsRef<std::path::Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{}.toml", APP_NAME));
        Self { config_path }
    }

    /// Determines the default path to the configuration file using `dirs::config_dir`.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
    }

    /// Loads the configuration from the config file or returns the default configuration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }
        let config_content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;
        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;
        Ok(config)
    }

    /// Saves the configuration to the config file, only writing non-default fields.
    pub fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;

        // Ensure the configuration directory exists.
        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_default_config() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());
        let config = manager.load().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());

        let mut config: Config = toml::from_str("device = \"USB Microphone\"").unwrap();
        config.set_api_base_url("https://coach.example.com");
        manager.save(&config).unwrap();

        let loaded_config = manager.load().unwrap();
        assert_eq!(loaded_config.api_base_url(), "https://coach.example.com");
        assert_eq!(loaded_config.device(), Some("USB Microphone"));
        assert_eq!(
            loaded_config.discard_under(),
            Config::default().discard_under()
        );
    }

    #[test]
    fn test_save_creates_config_file() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());

        let config = Config::default();
        manager.save(&config).unwrap();

        assert!(manager.config_path().exists());
    }

    #[test]
    fn test_language_hint_survives_reload() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());

        let config: Config = toml::from_str("language = \"en\"").unwrap();
        manager.save(&config).unwrap();

        assert_eq!(manager.load().unwrap().language(), Some("en"));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let mut config = Config::default();
        config.set_api_base_url("http://localhost:8000/");
        assert_eq!(config.api_base_url(), "http://localhost:8000");
    }
}
