//! Channel list helpers: search, grouping, merge filtering, navigation

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::models::Channel;

/// Navigation direction through the channel list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Case-insensitive match on name or group; a blank keyword keeps everything
pub fn filter_channels<'a>(channels: &'a [Channel], keyword: &str) -> Vec<&'a Channel> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return channels.iter().collect();
    }

    channels
        .iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&keyword) || c.group.to_lowercase().contains(&keyword)
        })
        .collect()
}

/// Channels whose group label equals `group`
pub fn filter_by_group<'a, I>(channels: I, group: &str) -> Vec<&'a Channel>
where
    I: IntoIterator<Item = &'a Channel>,
{
    channels.into_iter().filter(|c| c.group_label() == group).collect()
}

/// Sorted, unique group labels
pub fn groups(channels: &[Channel]) -> Vec<String> {
    channels
        .iter()
        .map(|c| c.group_label())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Channels bucketed by group label, groups sorted, list order kept inside each group
pub fn group_channels<'a, I>(channels: I) -> BTreeMap<&'a str, Vec<&'a Channel>>
where
    I: IntoIterator<Item = &'a Channel>,
{
    let mut grouped: BTreeMap<&'a str, Vec<&'a Channel>> = BTreeMap::new();
    for channel in channels {
        grouped.entry(channel.group_label()).or_default().push(channel);
    }
    grouped
}

/// Keep the new channels whose URL is neither stored nor repeated earlier in `new`
pub fn deduplicate(new: Vec<Channel>, existing: &[Channel]) -> Vec<Channel> {
    let mut seen: HashSet<String> = existing.iter().map(|c| c.url.clone()).collect();
    new.into_iter().filter(|c| seen.insert(c.url.clone())).collect()
}

/// Neighbor of `current_id`, wrapping around both ends
pub fn neighbor<'a>(channels: &'a [Channel], current_id: &str, direction: Direction) -> Option<&'a Channel> {
    let index = channels.iter().position(|c| c.id == current_id)?;
    let len = channels.len();
    let next = match direction {
        Direction::Next => (index + 1) % len,
        Direction::Previous => (index + len - 1) % len,
    };
    channels.get(next)
}
