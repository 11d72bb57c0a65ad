//! Persistence for the channel list, play history and settings
//!
//! Each operation is one read, a local change and one whole-value write.
//! There is no locking: two writers racing on the same key resolve as
//! last-write-wins.

mod store;

pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::channels;
use crate::config::{Settings, SettingsPatch};
use crate::error::{Error, Result};
use crate::m3u_parser;
use crate::models::{Channel, ChannelPatch};

/// Store keys
pub mod keys {
    pub const CHANNELS: &str = "channels";
    pub const HISTORY: &str = "history";
    pub const SETTINGS: &str = "settings";
}

/// History length cap; older entries fall off the end
pub const MAX_HISTORY_COUNT: usize = 50;

/// Channel, history and settings operations over a key-value store
#[derive(Debug)]
pub struct Storage<S> {
    store: S,
    max_history: usize,
}

impl<S: KeyValueStore> Storage<S> {
    pub fn new(store: S) -> Self {
        Self { store, max_history: MAX_HISTORY_COUNT }
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.store.set(key, serde_json::to_value(value)?)
    }

    fn read_channels(&self) -> Result<Vec<Channel>> {
        Ok(self.read(keys::CHANNELS)?.unwrap_or_default())
    }

    fn read_history(&self) -> Result<Vec<Channel>> {
        Ok(self.read(keys::HISTORY)?.unwrap_or_default())
    }

    // ========== Channels ==========

    pub fn get_channels(&self) -> Result<Vec<Channel>> {
        self.read_channels().map_err(|e| e.during("get channels"))
    }

    pub fn save_channels(&self, channels: &[Channel]) -> Result<()> {
        self.write(keys::CHANNELS, channels)
            .map_err(|e| e.during("save channels"))
    }

    pub fn find_channel(&self, id: &str) -> Result<Option<Channel>> {
        let channels = self.read_channels().map_err(|e| e.during("find channel"))?;
        Ok(channels.into_iter().find(|c| c.id == id))
    }

    /// Append one channel. Callers check for an existing URL first.
    pub fn add_channel(&self, channel: Channel) -> Result<()> {
        attempt("add channel", || {
            let mut channels = self.read_channels()?;
            channels.push(channel);
            self.write(keys::CHANNELS, &channels)
        })
    }

    /// Drop the channel with `id`; absent ids are not an error
    pub fn remove_channel(&self, id: &str) -> Result<()> {
        attempt("remove channel", || {
            let mut channels = self.read_channels()?;
            let before = channels.len();
            channels.retain(|c| c.id != id);
            if channels.len() == before {
                tracing::debug!("remove_channel: {} not in list", id);
            }
            self.write(keys::CHANNELS, &channels)
        })
    }

    /// Overwrite the fields carried by `patch` on the channel with `id`.
    ///
    /// A patched URL must not belong to another channel.
    pub fn update_channel(&self, id: &str, patch: &ChannelPatch) -> Result<Channel> {
        attempt("update channel", || {
            let mut channels = self.read_channels()?;
            if let Some(url) = &patch.url {
                if let Some(other) = channels.iter().find(|c| c.id != id && &c.url == url) {
                    return Err(Error::DuplicateUrl { url: url.clone(), id: other.id.clone() });
                }
            }
            let channel = channels
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| Error::ChannelNotFound(id.to_string()))?;
            patch.apply_to(channel);
            let updated = channel.clone();
            self.write(keys::CHANNELS, &channels)?;
            Ok(updated)
        })
    }

    /// Merge parsed channels into the stored list without overwriting.
    ///
    /// Returns how many channels were added.
    pub fn import_channels(&self, parsed: Vec<Channel>) -> Result<usize> {
        let added = attempt("import channels", || {
            let mut channels = self.read_channels()?;
            let new_channels = channels::deduplicate(parsed, &channels);
            let added = new_channels.len();
            channels.extend(new_channels);
            self.write(keys::CHANNELS, &channels)?;
            Ok(added)
        })?;
        tracing::info!("Imported {} new channels", added);
        Ok(added)
    }

    pub fn clear_channels(&self) -> Result<()> {
        self.write(keys::CHANNELS, &Vec::<Channel>::new())
            .map_err(|e| e.during("clear channels"))
    }

    /// Store a captured stream URL, reusing the channel already holding it
    pub fn capture_url(&self, url: &str) -> Result<Channel> {
        let candidate = m3u_parser::channel_from_url(url)?;
        attempt("capture url", || {
            let mut channels = self.read_channels()?;
            if let Some(existing) = channels.iter().find(|c| c.url == candidate.url) {
                return Ok(existing.clone());
            }
            channels.push(candidate.clone());
            self.write(keys::CHANNELS, &channels)?;
            Ok(candidate)
        })
    }

    // ========== History ==========

    /// Put `channel` at the front of the history, dropping older copies of its URL
    pub fn add_history(&self, channel: Channel) -> Result<()> {
        attempt("add history", || {
            let mut history = self.read_history()?;
            history.retain(|c| c.url != channel.url);
            history.insert(0, channel);
            history.truncate(self.max_history);
            self.write(keys::HISTORY, &history)
        })
    }

    pub fn get_history(&self) -> Result<Vec<Channel>> {
        self.read_history().map_err(|e| e.during("get history"))
    }

    pub fn clear_history(&self) -> Result<()> {
        self.write(keys::HISTORY, &Vec::<Channel>::new())
            .map_err(|e| e.during("clear history"))
    }

    // ========== Settings ==========

    /// Replace the persisted settings record with exactly the given fields
    pub fn save_settings(&self, settings: impl Into<SettingsPatch>) -> Result<()> {
        self.write(keys::SETTINGS, &settings.into())
            .map_err(|e| e.during("save settings"))
    }

    /// Persisted settings with every missing field filled from the defaults
    pub fn get_settings(&self) -> Result<Settings> {
        let saved: Option<SettingsPatch> = self
            .read(keys::SETTINGS)
            .map_err(|e| e.during("get settings"))?;
        Ok(saved.unwrap_or_default().merged_over(&Settings::default()))
    }

    /// Write the default settings when nothing is persisted yet.
    ///
    /// Returns true when the defaults were written.
    pub fn initialize_settings(&self) -> Result<bool> {
        let written = attempt("initialize settings", || {
            if self.store.get(keys::SETTINGS)?.is_some() {
                return Ok(false);
            }
            self.write(keys::SETTINGS, &SettingsPatch::from(Settings::default()))?;
            Ok(true)
        })?;
        if written {
            tracing::info!("Default settings initialized");
        }
        Ok(written)
    }
}

fn attempt<T>(op: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    f().map_err(|e| e.during(op))
}
