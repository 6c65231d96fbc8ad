//! Application configuration, stored as TOML under the home directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Generation endpoint accepting `{ "prompt": ... }`.
    pub endpoint: String,

    /// Optional bearer token for the endpoint.
    pub api_key: Option<String>,

    /// Delay between reveal steps, in milliseconds.
    pub typing_delay_ms: u64,

    /// UI preferences.
    pub ui: UiConfig,

    /// Data directory holding config, state and logs.
    #[serde(skip)]
    pub data_dir: PathBuf,
}

/// UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub theme: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: "http://localhost:3000/api/chat".to_string(),
            api_key: None,
            typing_delay_ms: 2,
            ui: UiConfig {
                theme: "dark".to_string(),
            },
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".palaver")
}

impl Config {
    /// Load configuration from `~/.palaver/config.toml`, falling back to
    /// defaults when the file does not exist yet.
    pub fn load() -> Result<Self> {
        let data_dir = default_data_dir();
        fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        let config_path = data_dir.join("config.toml");
        let mut config: Config = if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };
        config.data_dir = data_dir;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(self.data_dir.join("config.toml"), content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// API key from config or environment.
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("PALAVER_API_KEY").ok())
    }

    /// Directory backing the key-value state store.
    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.typing_delay_ms, 2);
        assert_eq!(config.ui.theme, "dark");
        assert!(config.endpoint.ends_with("/api/chat"));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = Config::default();
        config.endpoint = "https://example.com/chat".to_string();
        config.ui.theme = "light".to_string();

        let toml_text = toml::to_string_pretty(&config).expect("serialize config");
        let parsed: Config = toml::from_str(&toml_text).expect("parse config");
        assert_eq!(parsed.endpoint, config.endpoint);
        assert_eq!(parsed.ui.theme, "light");
    }
}
