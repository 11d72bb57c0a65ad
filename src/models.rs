//! Data models for the IPTV player

use serde::{Deserialize, Serialize};

/// Group label for channels whose playlist entry carries no `group-title`
pub const UNGROUPED: &str = "Ungrouped";

/// Name used when an `#EXTINF` line has no comma-separated title
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// Group label for channels captured from a bare stream URL
pub const TEMPORARY_GROUP: &str = "Temporary";

/// Name used for a captured URL whose last path segment is empty
pub const TEMPORARY_CHANNEL: &str = "Temporary Channel";

/// One playable entry (persisted in the channel list and the history)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub tvg_id: String,      // EPG correlation, passthrough only
    #[serde(default)]
    pub tvg_name: String,
}

fn default_group() -> String { UNGROUPED.to_string() }

impl Default for Channel {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            url: String::new(),
            group: default_group(),
            logo: String::new(),
            tvg_id: String::new(),
            tvg_name: String::new(),
        }
    }
}

impl Channel {
    /// Group label used for display and filtering (empty counts as ungrouped)
    pub fn group_label(&self) -> &str {
        if self.group.is_empty() { UNGROUPED } else { &self.group }
    }
}

/// Partial channel update; only the fields that are set get overwritten
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvg_name: Option<String>,
}

impl ChannelPatch {
    pub fn is_empty(&self) -> bool {
        self == &ChannelPatch::default()
    }

    /// Apply the set fields to `channel`. The id is left alone even when the url changes.
    pub fn apply_to(&self, channel: &mut Channel) {
        let fields = [
            (&self.name, &mut channel.name),
            (&self.url, &mut channel.url),
            (&self.group, &mut channel.group),
            (&self.logo, &mut channel.logo),
            (&self.tvg_id, &mut channel.tvg_id),
            (&self.tvg_name, &mut channel.tvg_name),
        ];
        for (update, field) in fields {
            if let Some(value) = update {
                *field = value.clone();
            }
        }
    }
}
