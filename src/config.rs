use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

const MAX_TIME_LIMIT_SECS: u32 = 600;
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Practice countdown in seconds; 0 means untimed.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: u32,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub ladder_path: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_time_limit_secs() -> u32 {
    60
}
fn default_user_id() -> String {
    "local".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_limit_secs: default_time_limit_secs(),
            user_id: default_user_id(),
            data_dir: None,
            ladder_path: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("typeladder")
            .join("config.toml")
    }

    /// Bring hand-edited values back into range.
    pub fn validate(&mut self) {
        if self.time_limit_secs > MAX_TIME_LIMIT_SECS {
            warn!(value = self.time_limit_secs, "time_limit_secs clamped to {MAX_TIME_LIMIT_SECS}");
            self.time_limit_secs = MAX_TIME_LIMIT_SECS;
        }
        if self.user_id.trim().is_empty() {
            self.user_id = default_user_id();
        }
        let level = self.log_level.to_ascii_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            self.log_level = level;
        } else {
            warn!(value = %self.log_level, "unknown log_level, using default");
            self.log_level = default_log_level();
        }
    }

    pub fn time_limit(&self) -> Option<u32> {
        (self.time_limit_secs > 0).then_some(self.time_limit_secs)
    }

    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("typeladder"),
        }
    }
}
