//! Playback session and external player engine
//!
//! The stream engine owns networking, buffering and recovery internals. This
//! module only selects what to play, records history and turns engine errors
//! into a retry or no-retry decision.

use std::process::{Child, Command, Stdio};

use crate::channels::{self, Direction};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::models::Channel;
use crate::storage::{KeyValueStore, Storage};

/// Error category reported by the stream engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    Network,
    Media,
    Other,
}

/// Error event raised by the stream engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamError {
    pub kind: StreamErrorKind,
    pub fatal: bool,
    pub details: String,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, fatal: bool, details: impl Into<String>) -> Self {
        Self { kind, fatal, details: details.into() }
    }

    /// What the session should ask the engine to do about this error
    pub fn recovery(&self) -> Recovery {
        match (self.kind, self.fatal) {
            (StreamErrorKind::Network, _) => Recovery::RestartLoad,
            (StreamErrorKind::Media, _) => Recovery::RecoverMedia,
            (StreamErrorKind::Other, true) => Recovery::GiveUp,
            (StreamErrorKind::Other, false) => Recovery::Ignore,
        }
    }
}

/// Outcome of handling a stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Reload the stream from the network
    RestartLoad,
    /// Ask the engine to recover its media pipeline
    RecoverMedia,
    /// Unrecoverable; logged only
    GiveUp,
    /// Non-fatal and not actionable; logged only
    Ignore,
}

/// Something that can play a stream URL
pub trait StreamEngine {
    /// Start playing `channel`, replacing whatever was playing
    fn load(&mut self, channel: &Channel, settings: &Settings) -> Result<()>;

    /// Reload the current stream after a network error
    fn restart_load(&mut self) -> Result<()>;

    /// Recover the current stream after a media error
    fn recover_media(&mut self) -> Result<()>;

    fn stop(&mut self);
}

/// Playback context: channel list snapshot, current channel and engine
pub struct PlayerSession<E> {
    engine: E,
    channels: Vec<Channel>,
    settings: Settings,
    current: Option<usize>,
    history_recorded: bool,
}

impl<E: StreamEngine> PlayerSession<E> {
    pub fn new(engine: E, channels: Vec<Channel>, settings: Settings) -> Self {
        Self {
            engine,
            channels,
            settings,
            current: None,
            history_recorded: false,
        }
    }

    pub fn current(&self) -> Option<&Channel> {
        self.current.and_then(|i| self.channels.get(i))
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Select the channel with `id` and hand it to the engine
    pub fn open(&mut self, id: &str) -> Result<&Channel> {
        let index = self
            .channels
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::ChannelNotFound(id.to_string()))?;

        let channel = &self.channels[index];
        tracing::info!("[PLAY] {} | {}", channel.name, channel.url);
        self.engine.load(channel, &self.settings)?;

        self.current = Some(index);
        self.history_recorded = false;
        Ok(&self.channels[index])
    }

    /// Step to the previous or next channel, wrapping at both ends.
    ///
    /// Returns `None` when nothing is playing.
    pub fn switch_channel(&mut self, direction: Direction) -> Result<Option<&Channel>> {
        let Some(current) = self.current() else {
            return Ok(None);
        };
        let Some(next_id) = channels::neighbor(&self.channels, &current.id, direction).map(|c| c.id.clone()) else {
            return Ok(None);
        };
        self.open(&next_id).map(Some)
    }

    /// Record the current channel in history on the first playing signal.
    ///
    /// Returns true when an entry was written.
    pub fn mark_playing<S: KeyValueStore>(&mut self, storage: &Storage<S>) -> Result<bool> {
        if self.history_recorded {
            return Ok(false);
        }
        let Some(channel) = self.current().cloned() else {
            return Ok(false);
        };
        storage.add_history(channel)?;
        self.history_recorded = true;
        Ok(true)
    }

    /// Forward an engine error to the matching recovery call
    pub fn handle_error(&mut self, error: &StreamError) -> Result<Recovery> {
        let recovery = error.recovery();
        match recovery {
            Recovery::RestartLoad => {
                tracing::warn!("Network error, reloading stream: {}", error.details);
                self.engine.restart_load()?;
            }
            Recovery::RecoverMedia => {
                tracing::warn!("Media error, recovering: {}", error.details);
                self.engine.recover_media()?;
            }
            Recovery::GiveUp => tracing::error!("Unrecoverable stream error: {}", error.details),
            Recovery::Ignore => tracing::debug!("Stream error: {}", error.details),
        }
        Ok(recovery)
    }

    pub fn stop(&mut self) {
        self.engine.stop();
        self.current = None;
    }
}

/// Engine that runs an external player process (ffplay, mpv, vlc, ...)
pub struct ExternalPlayer {
    command: String,
    child: Option<Child>,
    loaded: Option<(Channel, Settings)>,
}

impl ExternalPlayer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            child: None,
            loaded: None,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Command-line arguments for `player`, URL last
    pub fn player_args(player: &str, channel: &Channel, settings: &Settings) -> Vec<String> {
        let player_lower = player.to_lowercase();
        let volume = (settings.volume_fraction() * 100.0).round() as u8;
        let mut args = Vec::new();

        if player_lower.contains("ffplay") {
            args.extend([
                "-window_title".to_string(), channel.name.clone(),
                "-volume".to_string(), volume.to_string(),
                "-loglevel".to_string(), "warning".to_string(),
            ]);
        } else if player_lower.contains("mpv") {
            args.push(format!("--force-media-title={}", channel.name));
            args.push(format!("--volume={}", volume));
            if !settings.auto_play {
                args.push("--pause".to_string());
            }
        } else if player_lower.contains("vlc") {
            args.push(format!("--meta-title={}", channel.name));
            if !settings.auto_play {
                args.push("--start-paused".to_string());
            }
        }

        args.push(channel.url.clone());
        args
    }

    fn spawn(&mut self) -> Result<()> {
        self.kill();
        let Some((channel, settings)) = self.loaded.as_ref() else {
            return Err(Error::Player("nothing loaded".to_string()));
        };

        let mut cmd = Command::new(&self.command);
        cmd.args(Self::player_args(&self.command, channel, settings))
            .stdin(Stdio::null())
            .stdout(Stdio::null());

        let child = cmd
            .spawn()
            .map_err(|e| Error::Player(format!("failed to launch '{}': {}", self.command, e)))?;
        tracing::info!("[PLAY] Player launched (PID: {})", child.id());
        self.child = Some(child);
        Ok(())
    }

    fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait(); // reap
        }
    }

    /// Block until the player exits.
    ///
    /// An abnormal exit is reported as a fatal network error so the session
    /// can decide whether to reload.
    pub fn wait(&mut self) -> Result<Option<StreamError>> {
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };
        let status = child.wait()?;
        if status.success() {
            return Ok(None);
        }
        let details = match status.code() {
            Some(code) => format!("'{}' exited with code {}", self.command, code),
            None => format!("'{}' terminated by signal", self.command),
        };
        Ok(Some(StreamError::new(StreamErrorKind::Network, true, details)))
    }
}

impl StreamEngine for ExternalPlayer {
    fn load(&mut self, channel: &Channel, settings: &Settings) -> Result<()> {
        self.loaded = Some((channel.clone(), settings.clone()));
        self.spawn()
    }

    fn restart_load(&mut self) -> Result<()> {
        self.spawn()
    }

    // An external process has no media pipeline to reset; relaunch it.
    fn recover_media(&mut self) -> Result<()> {
        self.spawn()
    }

    fn stop(&mut self) {
        self.kill();
        self.loaded = None;
    }
}

impl Drop for ExternalPlayer {
    fn drop(&mut self) {
        self.kill();
    }
}
