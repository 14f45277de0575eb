//! Process configuration: an optional JSON file plus environment overrides.

use std::{env, fs, path::Path, time::Duration};

use anyhow::Context;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use services::services::config::BotConfig;

/// env var naming the JSON config file
pub const CONFIG_PATH_ENV: &str = "NEVERFORGET_CONFIG";
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

fn default_database_url() -> String {
    "sqlite://neverforget.db?mode=rwc".to_string()
}

fn default_pending_ttl_hours() -> u32 {
    24
}

fn default_reaper_interval_secs() -> u64 {
    600
}

fn default_poll_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// only ever read from the environment
    #[serde(skip)]
    pub telegram_token: Option<SecretString>,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub bot: BotConfig,
    /// pending definitions untouched for this long are dropped
    #[serde(default = "default_pending_ttl_hours")]
    pub pending_ttl_hours: u32,
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
    /// long polling timeout for getUpdates
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default)]
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_token: None,
            database_url: default_database_url(),
            bot: BotConfig::default(),
            pending_ttl_hours: default_pending_ttl_hours(),
            reaper_interval_secs: default_reaper_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            log_json: false,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(token) = var(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.telegram_token = Some(SecretString::from(token));
        }
        if let Some(url) = var(DATABASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.database_url = url;
        }
    }

    pub fn pending_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_hours(i64::from(self.pending_ttl_hours))
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn reaper_interval(&self) -> Duration {
        // zero would make the interval panic
        Duration::from_secs(self.reaper_interval_secs.max(1))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}
