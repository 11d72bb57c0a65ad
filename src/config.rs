//! Configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "iptv_player";

pub const DEFAULT_QUALITY: &str = "auto";
pub const DEFAULT_VOLUME: u8 = 80;
pub const MAX_VOLUME: u8 = 100;

/// Playback settings, persisted under the `settings` key.
///
/// Every field has a serde default so a partial persisted record is merged
/// against the defaults on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_quality")]
    pub default_quality: String, // auto / 720p / 1080p
    #[serde(default = "default_true")]
    pub auto_play: bool,
    #[serde(default = "default_volume")]
    pub volume: u8,
}

fn default_quality() -> String { DEFAULT_QUALITY.to_string() }
fn default_true() -> bool { true }
fn default_volume() -> u8 { DEFAULT_VOLUME }

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_quality: default_quality(),
            auto_play: true,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl Settings {
    /// Volume as a 0.0-1.0 fraction, clamped
    pub fn volume_fraction(&self) -> f32 {
        f32::from(self.volume.min(MAX_VOLUME)) / f32::from(MAX_VOLUME)
    }
}

/// Settings record as written by a caller that may only know some fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_play: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u8>,
}

impl From<Settings> for SettingsPatch {
    fn from(settings: Settings) -> Self {
        Self {
            default_quality: Some(settings.default_quality),
            auto_play: Some(settings.auto_play),
            volume: Some(settings.volume),
        }
    }
}

impl From<&Settings> for SettingsPatch {
    fn from(settings: &Settings) -> Self {
        settings.clone().into()
    }
}

impl SettingsPatch {
    /// Fill the fields this patch leaves out from `base`
    pub fn merged_over(self, base: &Settings) -> Settings {
        Settings {
            default_quality: self.default_quality.unwrap_or_else(|| base.default_quality.clone()),
            auto_play: self.auto_play.unwrap_or(base.auto_play),
            volume: self.volume.unwrap_or(base.volume),
        }
    }
}

/// Local application config (not shared through the store)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub external_player: String,
    /// Where the channel/history/settings files live; empty means the data dir
    #[serde(default)]
    pub store_dir: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_retries")]
    pub play_retries: u32,
}

fn default_user_agent() -> String { format!("iptv-player/{}", env!("CARGO_PKG_VERSION")) }
fn default_retries() -> u32 { 1 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            external_player: String::new(),
            store_dir: String::new(),
            user_agent: default_user_agent(),
            play_retries: default_retries(),
        }
    }
}

impl AppConfig {
    fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        fs::create_dir_all(&path).ok();
        path.push("config.json");
        path
    }

    pub fn load() -> Self {
        let path = Self::config_path();

        if path.exists() {
            match fs::read_to_string(&path).map(|content| serde_json::from_str(&content)) {
                Ok(Ok(config)) => return config,
                Ok(Err(e)) => tracing::warn!("Ignoring invalid config {}: {}", path.display(), e),
                Err(e) => tracing::warn!("Cannot read config {}: {}", path.display(), e),
            }
        }

        Self::default()
    }

    pub fn save(&self) {
        let path = Self::config_path();
        if let Ok(content) = serde_json::to_string_pretty(self) {
            if let Err(e) = fs::write(&path, content) {
                tracing::warn!("Cannot write config {}: {}", path.display(), e);
            }
        }
    }

    /// Directory holding the persisted keys
    pub fn store_path(&self) -> PathBuf {
        if !self.store_dir.is_empty() {
            return PathBuf::from(&self.store_dir);
        }
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path
    }

    /// Player command, ffplay when none is configured
    pub fn player_command(&self) -> &str {
        if self.external_player.is_empty() { "ffplay" } else { &self.external_player }
    }
}
