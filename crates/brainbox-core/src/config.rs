use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "BRAINBOX_API_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub reminders: ReminderConfig,
    pub notifications: NotificationConfig,
    pub chat: ChatConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub poll_interval_seconds: u64,
    pub snooze_minutes: u32,
    pub max_visible_toasts: usize,
    pub ack_policy: AckPolicy,
}

/// When a due reminder counts as handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckPolicy {
    /// Acknowledge as soon as the reminder has been delivered.
    #[default]
    OnDelivery,
    /// Only acknowledge from an explicit Snooze/Done action.
    OnAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Stands in for the platform permission prompt: `false` means denied.
    pub enabled: bool,
    pub app_name: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub voice_enabled: bool,
    pub language: String,
    pub mode: String,
    pub play_audio: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_seconds: 30,
            connect_timeout_seconds: 10,
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_seconds: 15,
            snooze_minutes: 5,
            max_visible_toasts: 4,
            ack_policy: AckPolicy::OnDelivery,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_name: "BrainBox Assistant".to_string(),
            title: "⏰ Reminder".to_string(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            voice_enabled: false,
            language: "auto".to_string(),
            mode: "default".to_string(),
            play_audio: true,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
        }
    }
}

impl ReminderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(1))
    }
}

impl AppConfig {
    /// Load config from `~/.brainbox/config.toml`, creating defaults if missing.
    pub fn load() -> Result<Self> {
        let base_dir = Self::default_base_dir()?;
        let config_path = base_dir.join("config.toml");

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let config = AppConfig::default();
            fs::create_dir_all(&base_dir)?;
            let toml_str = toml::to_string_pretty(&config)
                .map_err(|e| CoreError::Config(format!("failed to serialize config: {e}")))?;
            fs::write(&config_path, toml_str)?;
            config
        };

        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific path (for testing or custom setups).
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("failed to read config: {e}")))?;
        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| CoreError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Returns the default base directory (`~/.brainbox`).
    pub fn default_base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Config("could not determine home directory".to_string()))?;
        Ok(home.join(".brainbox"))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
    }
}

/// Initialize tracing/logging with env filter.
///
/// Respects `RUST_LOG` env var. Defaults to `info` level. Logs go to stderr so
/// they don't interleave with the chat transcript on stdout.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
