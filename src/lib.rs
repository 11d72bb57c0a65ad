//! IPTV Player
//!
//! M3U playlist import, a persisted channel library with play history and
//! settings, and a playback session that drives an external player.

pub mod channels;
pub mod config;
pub mod error;
pub mod m3u_parser;
pub mod models;
pub mod player;
pub mod storage;

#[cfg(test)]
mod storage_tests;

pub use config::{AppConfig, Settings, SettingsPatch};
pub use error::{Error, Result};
pub use m3u_parser::{generate_id_from_url, parse_m3u};
pub use models::{Channel, ChannelPatch};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, Storage};
