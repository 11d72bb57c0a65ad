//! Tests for channel, history and settings persistence

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::config::{Settings, SettingsPatch};
    use crate::error::{Error, Result};
    use crate::m3u_parser::parse_m3u;
    use crate::models::{Channel, ChannelPatch};
    use crate::storage::*;

    /// Store that is never reachable
    struct OfflineStore;

    impl KeyValueStore for OfflineStore {
        fn get(&self, _key: &str) -> Result<Option<Value>> {
            Err(Error::Unavailable)
        }

        fn set(&self, _key: &str, _value: Value) -> Result<()> {
            Err(Error::Unavailable)
        }
    }

    fn channel(n: usize) -> Channel {
        let url = format!("http://example.com/live/{}.m3u8", n);
        Channel {
            id: crate::generate_id_from_url(&url),
            name: format!("Channel {}", n),
            url,
            group: "News".to_string(),
            ..Default::default()
        }
    }

    fn storage() -> Storage<MemoryStore> {
        Storage::new(MemoryStore::new())
    }

    #[test]
    fn test_empty_store_reads_empty() {
        let storage = storage();
        assert!(storage.get_channels().unwrap().is_empty());
        assert!(storage.get_history().unwrap().is_empty());
        assert_eq!(storage.get_settings().unwrap(), Settings::default());
    }

    #[test]
    fn test_save_and_add_channels() {
        let storage = storage();
        storage.save_channels(&[channel(1), channel(2)]).unwrap();
        storage.add_channel(channel(3)).unwrap();

        let channels = storage.get_channels().unwrap();
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[2], channel(3));
        assert_eq!(storage.find_channel(&channel(2).id).unwrap(), Some(channel(2)));
        assert_eq!(storage.find_channel("missing").unwrap(), None);
    }

    #[test]
    fn test_remove_channel() {
        let storage = storage();
        storage.save_channels(&[channel(1), channel(2)]).unwrap();

        storage.remove_channel(&channel(1).id).unwrap();
        assert_eq!(storage.get_channels().unwrap(), vec![channel(2)]);

        // absent id: no error, list untouched, repeatable
        storage.remove_channel("ch_missing").unwrap();
        storage.remove_channel(&channel(1).id).unwrap();
        assert_eq!(storage.get_channels().unwrap(), vec![channel(2)]);
    }

    #[test]
    fn test_update_channel() {
        let storage = storage();
        storage.save_channels(&[channel(1), channel(2)]).unwrap();

        let patch = ChannelPatch {
            name: Some("Renamed".to_string()),
            logo: Some("http://example.com/logo.png".to_string()),
            ..Default::default()
        };
        let updated = storage.update_channel(&channel(2).id, &patch).unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.group, "News");

        let stored = storage.get_channels().unwrap();
        assert_eq!(stored[0], channel(1));
        assert_eq!(stored[1], updated);
    }

    #[test]
    fn test_update_missing_channel_leaves_state() {
        let storage = storage();
        storage.save_channels(&[channel(1)]).unwrap();
        let before = storage.store().get(keys::CHANNELS).unwrap();

        let patch = ChannelPatch { name: Some("X".to_string()), ..Default::default() };
        let err = storage.update_channel("ch_missing", &patch).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Failed to update channel: Channel not found: ch_missing");
        assert_eq!(storage.store().get(keys::CHANNELS).unwrap(), before);
    }

    #[test]
    fn test_update_rejects_url_of_another_channel() {
        let storage = storage();
        storage.save_channels(&[channel(1), channel(2)]).unwrap();
        let before = storage.store().get(keys::CHANNELS).unwrap();

        let patch = ChannelPatch { url: Some(channel(1).url), ..Default::default() };
        let err = storage.update_channel(&channel(2).id, &patch).unwrap_err();
        assert!(matches!(err, Error::Operation { ref source, .. } if matches!(**source, Error::DuplicateUrl { .. })));
        assert_eq!(storage.store().get(keys::CHANNELS).unwrap(), before);

        // re-saving its own URL is fine
        let own = ChannelPatch { url: Some(channel(2).url), ..Default::default() };
        assert_eq!(storage.update_channel(&channel(2).id, &own).unwrap(), channel(2));

        let fresh = ChannelPatch { url: Some("http://example.com/live/new.m3u8".to_string()), ..Default::default() };
        let moved = storage.update_channel(&channel(2).id, &fresh).unwrap();
        assert_eq!(moved.url, "http://example.com/live/new.m3u8");
        assert_eq!(moved.id, channel(2).id);
    }

    #[test]
    fn test_import_merges_new_urls_only() {
        let storage = storage();
        storage.save_channels(&[channel(1)]).unwrap();

        let playlist = r#"#EXTM3U
#EXTINF:-1 group-title="News",Again
http://example.com/live/1.m3u8
#EXTINF:-1 group-title="Sports",Fresh
http://example.com/live/9.m3u8
#EXTINF:-1 group-title="Sports",Fresh duplicate
http://example.com/live/9.m3u8
"#;
        let added = storage.import_channels(parse_m3u(playlist)).unwrap();
        assert_eq!(added, 1);

        let channels = storage.get_channels().unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0], channel(1));
        assert_eq!(channels[1].name, "Fresh");

        assert_eq!(storage.import_channels(parse_m3u(playlist)).unwrap(), 0);
    }

    #[test]
    fn test_clear_channels() {
        let storage = storage();
        storage.save_channels(&[channel(1), channel(2)]).unwrap();
        storage.clear_channels().unwrap();
        assert!(storage.get_channels().unwrap().is_empty());
    }

    #[test]
    fn test_capture_url_reuses_existing() {
        let storage = storage();
        storage.save_channels(&[channel(1)]).unwrap();

        let existing = storage.capture_url(&channel(1).url).unwrap();
        assert_eq!(existing, channel(1));

        let captured = storage.capture_url("https://example.com/pop-up/event.m3u8").unwrap();
        assert!(captured.id.starts_with("temp_"));
        assert_eq!(captured.name, "event.m3u8");
        assert_eq!(storage.get_channels().unwrap().len(), 2);

        let err = storage.capture_url("ftp://example.com/x.m3u8").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert_eq!(storage.get_channels().unwrap().len(), 2);
    }

    #[test]
    fn test_history_dedups_by_url() {
        let storage = storage();
        let first = channel(1);
        let mut second = channel(1);
        second.name = "Same stream, new name".to_string();

        storage.add_history(first).unwrap();
        storage.add_history(channel(2)).unwrap();
        storage.add_history(second.clone()).unwrap();

        let history = storage.get_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], second);
        assert_eq!(history[1], channel(2));
    }

    #[test]
    fn test_history_same_url_twice() {
        let storage = storage();
        storage.add_history(channel(7)).unwrap();
        let mut again = channel(7);
        again.group = "Replay".to_string();
        storage.add_history(again.clone()).unwrap();
        assert_eq!(storage.get_history().unwrap(), vec![again]);
    }

    #[test]
    fn test_history_capped_at_fifty() {
        let storage = storage();
        for n in 0..51 {
            storage.add_history(channel(n)).unwrap();
        }
        let history = storage.get_history().unwrap();
        assert_eq!(history.len(), MAX_HISTORY_COUNT);
        assert_eq!(history[0], channel(50));
        assert_eq!(history[49], channel(1));
        assert!(!history.contains(&channel(0)));
    }

    #[test]
    fn test_history_custom_cap_and_clear() {
        let storage = storage().with_max_history(2);
        for n in 0..5 {
            storage.add_history(channel(n)).unwrap();
        }
        assert_eq!(storage.get_history().unwrap(), vec![channel(4), channel(3)]);

        storage.clear_history().unwrap();
        assert!(storage.get_history().unwrap().is_empty());
    }

    #[test]
    fn test_settings_partial_save_merges_defaults() {
        let storage = storage();
        storage
            .save_settings(SettingsPatch { volume: Some(50), ..Default::default() })
            .unwrap();
        assert_eq!(storage.store().get(keys::SETTINGS).unwrap(), Some(json!({"volume": 50})));

        let settings = storage.get_settings().unwrap();
        assert_eq!(settings.volume, 50);
        assert_eq!(settings.default_quality, "auto");
        assert!(settings.auto_play);
    }

    #[test]
    fn test_settings_full_save() {
        let storage = storage();
        let settings = Settings {
            default_quality: "1080p".to_string(),
            auto_play: false,
            volume: 10,
        };
        storage.save_settings(&settings).unwrap();
        assert_eq!(storage.get_settings().unwrap(), settings);
    }

    #[test]
    fn test_initialize_settings_once() {
        let storage = storage();
        assert!(storage.initialize_settings().unwrap());
        assert!(!storage.initialize_settings().unwrap());

        storage.save_settings(SettingsPatch { auto_play: Some(false), ..Default::default() }).unwrap();
        assert!(!storage.initialize_settings().unwrap());
        assert!(!storage.get_settings().unwrap().auto_play);
    }

    #[test]
    fn test_offline_store_fails_every_operation() {
        let storage = Storage::new(OfflineStore);
        let patch = ChannelPatch::default();

        let errors = [
            storage.get_channels().map(drop),
            storage.save_channels(&[channel(1)]),
            storage.add_channel(channel(1)),
            storage.remove_channel("x"),
            storage.update_channel("x", &patch).map(drop),
            storage.add_history(channel(1)),
            storage.get_history().map(drop),
            storage.clear_history(),
            storage.get_settings().map(drop),
            storage.save_settings(Settings::default()),
        ];
        for result in errors {
            let err = result.unwrap_err();
            assert!(err.is_unavailable(), "{}", err);
            assert!(err.to_string().starts_with("Failed to "));
        }
    }

    #[test]
    fn test_file_store_backed_storage() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = Storage::new(JsonFileStore::open(dir.path()).unwrap());
            storage.save_channels(&[channel(1)]).unwrap();
            storage.add_history(channel(1)).unwrap();
        }
        let storage = Storage::new(JsonFileStore::open(dir.path()).unwrap());
        assert_eq!(storage.get_channels().unwrap(), vec![channel(1)]);
        assert_eq!(storage.get_history().unwrap(), vec![channel(1)]);
    }
}
