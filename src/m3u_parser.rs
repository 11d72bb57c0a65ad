//! M3U playlist parser with HTTPS download support

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::{Error, Result};
use crate::models::{Channel, TEMPORARY_CHANNEL, TEMPORARY_GROUP, UNGROUPED, UNKNOWN_CHANNEL};

const EXTINF: &str = "#EXTINF";
const ID_PREFIX: &str = "ch_";
const TEMP_ID_PREFIX: &str = "temp_";

static TVG_ID: LazyLock<Regex> = LazyLock::new(|| attr_regex("tvg-id"));
static TVG_NAME: LazyLock<Regex> = LazyLock::new(|| attr_regex("tvg-name"));
static TVG_LOGO: LazyLock<Regex> = LazyLock::new(|| attr_regex("tvg-logo"));
static GROUP_TITLE: LazyLock<Regex> = LazyLock::new(|| attr_regex("group-title"));

fn attr_regex(name: &str) -> Regex {
    Regex::new(&format!(r#"(?i){}="([^"]*)""#, regex::escape(name)))
        .expect("attribute pattern is a valid regex")
}

/// Download and parse M3U from URL (supports HTTP and HTTPS)
pub fn download_and_parse(url: &str, user_agent: &str) -> Result<Vec<Channel>> {
    let agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(120)))
        .timeout_connect(Some(Duration::from_secs(30)))
        .build()
        .new_agent();

    tracing::debug!("Downloading playlist from {}", url);
    let mut response = agent.get(url).header("User-Agent", user_agent).call()?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(Error::HttpStatus(status));
    }

    let content = response.body_mut().read_to_string()?;
    Ok(parse_m3u(&content))
}

/// Parse M3U content into channels.
///
/// Entries without a URL line are dropped, never reported. Duplicate URLs in
/// the input are kept; merging into a stored list removes them.
pub fn parse_m3u(content: &str) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut pending: Option<Channel> = None;

    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    for line in content.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(EXTINF) {
            if let Some(channel) = pending.take().filter(|c| !c.url.is_empty()) {
                channels.push(channel);
            }
            pending = Some(parse_extinf(line));
            continue;
        }

        // Any other directive or comment
        if line.starts_with('#') {
            continue;
        }

        if let Some(channel) = pending.as_mut() {
            channel.url = line.to_string();
            channel.id = generate_id_from_url(line);
        }
    }

    if let Some(channel) = pending.filter(|c| !c.url.is_empty()) {
        channels.push(channel);
    }

    tracing::debug!("Parsed {} channels from playlist", channels.len());
    channels
}

/// Build the pending channel for one `#EXTINF` line
fn parse_extinf(line: &str) -> Channel {
    let mut channel = Channel::default();

    // Name follows the last comma, so commas inside quoted attributes are harmless
    let attrs = match line.rfind(',') {
        Some(comma) => {
            channel.name = line[comma + 1..].trim().to_string();
            &line[..comma]
        }
        None => {
            channel.name = UNKNOWN_CHANNEL.to_string();
            line
        }
    };

    let capture = |re: &Regex| re.captures(attrs).map(|caps| caps[1].to_string());

    if let Some(tvg_id) = capture(&TVG_ID) {
        channel.tvg_id = tvg_id;
    }
    if let Some(tvg_name) = capture(&TVG_NAME) {
        channel.tvg_name = tvg_name;
    }
    if let Some(logo) = capture(&TVG_LOGO) {
        channel.logo = logo;
    }
    channel.group = capture(&GROUP_TITLE).unwrap_or_else(|| UNGROUPED.to_string());

    channel
}

/// Derive the channel id from its URL.
///
/// Java-style string hash over UTF-16 code units with 32-bit wrap-around,
/// absolute value in base 36. Ids already persisted by older installs rely on
/// this exact output.
pub fn generate_id_from_url(url: &str) -> String {
    let hash = url.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    format!("{}{}", ID_PREFIX, to_base36(hash.unsigned_abs()))
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Check that selected text looks like an HLS/M3U stream link
pub fn is_valid_stream_url(text: &str) -> bool {
    let url = text.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return false;
    }
    url.contains(".m3u8") || url.contains(".m3u")
}

/// Build a temporary channel for a stream URL captured outside any playlist
pub fn channel_from_url(text: &str) -> Result<Channel> {
    let url = text.trim();
    if !is_valid_stream_url(url) {
        return Err(Error::InvalidUrl(url.to_string()));
    }

    let name = url
        .rsplit('/')
        .next()
        .and_then(|segment| segment.split('?').next())
        .filter(|name| !name.is_empty())
        .unwrap_or(TEMPORARY_CHANNEL);

    Ok(Channel {
        id: format!("{}{}", TEMP_ID_PREFIX, chrono::Utc::now().timestamp_millis()),
        name: name.to_string(),
        url: url.to_string(),
        group: TEMPORARY_GROUP.to_string(),
        ..Default::default()
    })
}
