//! Connection and polling configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::logger::MessageLogMode;
use crate::protocol::DEFAULT_BASE_URL;
use crate::{Error, Result};

pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 300;
pub const MIN_SCAN_INTERVAL_SECS: u64 = 60;
pub const MAX_SCAN_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Account e-mail.
    pub username: String,
    pub password: String,
    /// Poll interval in seconds, clamped by [`Config::scan_interval`].
    pub scan_interval: u64,
    pub base_url: String,
    /// Optional NDJSON record of every API exchange.
    pub message_log: Option<MessageLogConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageLogConfig {
    pub mode: MessageLogMode,
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            scan_interval: DEFAULT_SCAN_INTERVAL_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
            message_log: None,
        }
    }
}

impl Config {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::Config("username is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(Error::Config("password is required".to_string()));
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(
            self.scan_interval
                .clamp(MIN_SCAN_INTERVAL_SECS, MAX_SCAN_INTERVAL_SECS),
        )
    }
}
