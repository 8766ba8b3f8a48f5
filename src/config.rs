//! Persistent configuration
//!
//! Stored as TOML under the user config directory. Every field has a default,
//! so partial files are accepted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PlatterError;
use crate::schema::GAMEPAD_CHANNEL;
use crate::session::DEFAULT_CHANNEL_CAPACITY;
use crate::types::WeekStart;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatterConfig {
    /// How long a spin highlight stays lit after the last scratch event
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub week_start: WeekStart,
    /// JSON file backing the statistics store
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Name of the controller event channel
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// `tracing` filter directive used by the binary
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_debounce_ms() -> u64 {
    50
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("platter")
        .join("statistics.json")
}

fn default_channel() -> String {
    GAMEPAD_CHANNEL.to_string()
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PlatterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            week_start: WeekStart::default(),
            store_path: default_store_path(),
            channel: default_channel(),
            channel_capacity: default_channel_capacity(),
            log_level: default_log_level(),
        }
    }
}

impl PlatterConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("platter")
            .join("config.toml")
    }

    /// Load config from a file, or return defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, PlatterError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, PlatterError> {
        let config: PlatterConfig =
            toml::from_str(content).map_err(|e| PlatterError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), PlatterError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PlatterError::ConfigError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn validate(&self) -> Result<(), PlatterError> {
        if self.debounce_ms == 0 {
            return Err(PlatterError::ConfigError(
                "debounce_ms must be greater than zero".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(PlatterError::ConfigError(
                "channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
