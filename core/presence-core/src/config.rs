//! Runtime configuration.
//!
//! Loaded from `~/.presence-card/config.toml` unless a path is given. A
//! missing file yields defaults; a malformed one is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::avatar::{DEFAULT_AVATAR_TIMEOUT_SECS, DEFAULT_CDN_BASE};
use crate::error::{PresenceError, Result};
use crate::notify::{NotificationMode, NotificationModeName};
use crate::profile::{DEFAULT_API_BASE, DEFAULT_PROFILE_TIMEOUT_SECS};

pub const CONFIG_DIR_NAME: &str = ".presence-card";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEBUG_LOG_ENV: &str = "PRESENCE_CARD_DEBUG_LOG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub notifications: NotificationsConfig,
    pub render: RenderConfig,
    pub assets: AssetsConfig,
    pub discord: DiscordConfig,
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub mode: NotificationModeName,
    /// Queue length for `bounded` mode.
    pub capacity: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            mode: NotificationModeName::Rendezvous,
            capacity: 64,
        }
    }
}

impl NotificationsConfig {
    pub fn mode(&self) -> NotificationMode {
        NotificationMode::from_config(self.mode, self.capacity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Text size in points.
    pub font_size: f32,
    pub font_dpi: f32,
    pub avatar_timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_size: 13.0,
            font_dpi: 150.0,
            avatar_timeout_secs: DEFAULT_AVATAR_TIMEOUT_SECS,
        }
    }
}

impl RenderConfig {
    pub fn avatar_timeout(&self) -> Duration {
        Duration::from_secs(self.avatar_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub font: PathBuf,
    /// Optional pre-rendered template PNG; generated in memory when unset.
    pub template: Option<PathBuf>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            font: PathBuf::from("assets/inconsolata_regular.ttf"),
            template: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Environment variable holding the bot token.
    pub token_env: String,
    pub api_base: String,
    pub cdn_base: String,
    /// Profile REST request timeout.
    pub timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token_env: "DISCORD_TOKEN".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            cdn_base: DEFAULT_CDN_BASE.to_string(),
            timeout_secs: DEFAULT_PROFILE_TIMEOUT_SECS,
        }
    }
}

impl DiscordConfig {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub users_file: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            users_file: PathBuf::from("assets/user_tracking.json"),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Returns the default config path (`~/.presence-card/config.toml`).
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(PresenceError::HomeDirNotFound)?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Loads configuration, returning defaults when the file does not exist.
pub fn load_config(path: Option<&Path>) -> Result<PresenceConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };

    if !config_path.exists() {
        return Ok(PresenceConfig::default());
    }

    let content = fs_err::read_to_string(&config_path)
        .map_err(|err| PresenceError::io("Failed to read config", err))?;
    toml::from_str::<PresenceConfig>(&content).map_err(|err| PresenceError::ConfigMalformed {
        path: config_path,
        details: err.to_string(),
    })
}

/// True when the debug-log environment variable is set to a truthy value.
pub fn debug_log_enabled() -> bool {
    std::env::var(DEBUG_LOG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}
