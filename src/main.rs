//! IPTV Player - command line shell
//! Import M3U playlists, manage the channel library and play channels in an external player

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use iptv_player::channels::{self, Direction};
use iptv_player::config::{AppConfig, SettingsPatch, MAX_VOLUME};
use iptv_player::error::Result;
use iptv_player::m3u_parser;
use iptv_player::models::{Channel, ChannelPatch};
use iptv_player::player::{ExternalPlayer, PlayerSession, Recovery};
use iptv_player::storage::{JsonFileStore, Storage};

#[derive(Parser, Debug)]
#[command(name = "iptv-player", version, about = "IPTV channel manager and player")]
struct Args {
    /// Directory holding channels.json, history.json and settings.json
    #[arg(long, env = "IPTV_PLAYER_STORE_DIR", global = true)]
    store_dir: Option<PathBuf>,

    /// External player command (ffplay, mpv, vlc, ...)
    #[arg(long, global = true)]
    player: Option<String>,

    /// Log filter, e.g. "info" or "iptv_player=debug"
    #[arg(long, env = "IPTV_PLAYER_LOG", default_value = "warn", global = true)]
    log_level: String,

    /// More log output (-v info, -vv debug, -vvv trace); overrides --log-level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import channels from an M3U file or URL (existing URLs are kept)
    Import { source: String },
    /// List channels grouped by group title
    List {
        /// Case-insensitive match on name or group
        #[arg(long, short)]
        search: Option<String>,
        /// Only this group
        #[arg(long, short)]
        group: Option<String>,
        /// Show play history instead of the channel list
        #[arg(long)]
        history: bool,
    },
    /// List group titles
    Groups,
    /// Show one channel as JSON
    Show { id: String },
    /// Change fields of a channel
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        logo: Option<String>,
        #[arg(long)]
        tvg_id: Option<String>,
        #[arg(long)]
        tvg_name: Option<String>,
    },
    /// Remove a channel
    Remove { id: String },
    /// Remove every channel
    Clear,
    /// Save a stream URL as a temporary channel
    Capture {
        url: String,
        /// Start playing it right away
        #[arg(long)]
        play: bool,
    },
    /// Show play history
    History,
    /// Clear play history
    ClearHistory,
    /// Show or change playback settings
    Settings {
        #[arg(long)]
        quality: Option<String>,
        #[arg(long)]
        auto_play: Option<bool>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=(MAX_VOLUME as i64)))]
        volume: Option<u8>,
    },
    /// Show the app config; --save writes it back with the global overrides applied
    Config {
        #[arg(long)]
        save: bool,
    },
    /// Play a channel in the external player
    Play {
        id: String,
        /// Relaunch attempts after the player fails
        #[arg(long)]
        retries: Option<u32>,
        /// Continue with the next channel when the player exits normally
        #[arg(long)]
        zap: bool,
    },
}

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_new(log_filter(&args)).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(args) {
        tracing::error!("Application error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Filter directive: `-v` counts win over `--log-level`
fn log_filter(args: &Args) -> &str {
    match args.verbose {
        0 => &args.log_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = AppConfig::load();
    if let Some(dir) = &args.store_dir {
        config.store_dir = dir.display().to_string();
    }
    if let Some(player) = &args.player {
        config.external_player = player.clone();
    }

    let store = JsonFileStore::open(config.store_path())?;
    tracing::debug!("Using store at {}", store.dir().display());
    let storage = Storage::new(store);
    storage.initialize_settings()?;

    match args.command {
        Commands::Import { source } => {
            let parsed = if source.starts_with("http://") || source.starts_with("https://") {
                m3u_parser::download_and_parse(&source, &config.user_agent)?
            } else {
                m3u_parser::parse_m3u(&fs::read_to_string(&source)?)
            };
            let found = parsed.len();
            let added = storage.import_channels(parsed)?;
            println!("Imported {} channels ({} in playlist)", added, found);
        }
        Commands::List { search, group, history } => {
            let list = if history { storage.get_history()? } else { storage.get_channels()? };
            let mut shown = channels::filter_channels(&list, search.as_deref().unwrap_or(""));
            if let Some(group) = &group {
                shown = channels::filter_by_group(shown, group);
            }
            if shown.is_empty() {
                println!("No channels found");
            } else if history {
                print_plain(&shown);
            } else {
                print_grouped(&shown);
            }
        }
        Commands::Groups => {
            for group in channels::groups(&storage.get_channels()?) {
                println!("{}", group);
            }
        }
        Commands::Show { id } => match storage.find_channel(&id)? {
            Some(channel) => println!("{}", serde_json::to_string_pretty(&channel)?),
            None => return Err(iptv_player::Error::ChannelNotFound(id)),
        },
        Commands::Update { id, name, url, group, logo, tvg_id, tvg_name } => {
            let patch = ChannelPatch { name, url, group, logo, tvg_id, tvg_name };
            if patch.is_empty() {
                println!("Nothing to update");
                return Ok(());
            }
            let channel = storage.update_channel(&id, &patch)?;
            println!("Updated {} ({})", channel.name, channel.id);
        }
        Commands::Remove { id } => {
            storage.remove_channel(&id)?;
            println!("Removed {}", id);
        }
        Commands::Clear => {
            storage.clear_channels()?;
            println!("All channels cleared");
        }
        Commands::Capture { url, play } => {
            let channel = storage.capture_url(&url)?;
            println!("{}  {}", channel.id, channel.name);
            if play {
                play_channel(&storage, &config, &channel.id, None, false)?;
            }
        }
        Commands::History => {
            let history = storage.get_history()?;
            print_plain(&history.iter().collect::<Vec<_>>());
        }
        Commands::ClearHistory => {
            storage.clear_history()?;
            println!("History cleared");
        }
        Commands::Settings { quality, auto_play, volume } => {
            let current = storage.get_settings()?;
            if quality.is_some() || auto_play.is_some() || volume.is_some() {
                let patch = SettingsPatch { default_quality: quality, auto_play, volume };
                storage.save_settings(patch.merged_over(&current))?;
            }
            println!("{}", serde_json::to_string_pretty(&storage.get_settings()?)?);
        }
        Commands::Config { save } => {
            if save {
                config.save();
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Play { id, retries, zap } => {
            play_channel(&storage, &config, &id, retries, zap)?;
        }
    }

    Ok(())
}

fn play_channel(
    storage: &Storage<JsonFileStore>,
    config: &AppConfig,
    id: &str,
    retries: Option<u32>,
    zap: bool,
) -> Result<()> {
    let engine = ExternalPlayer::new(config.player_command());
    let mut session = PlayerSession::new(engine, storage.get_channels()?, storage.get_settings()?);
    let retries = retries.unwrap_or(config.play_retries);

    session.open(id)?;
    tracing::info!("Playing {} with {}", id, session.engine().command());
    loop {
        session.mark_playing(storage)?;
        let mut attempts = 0;

        let finished_normally = loop {
            let Some(error) = session.engine_mut().wait()? else {
                break true;
            };
            if attempts >= retries {
                tracing::error!("Giving up after {} attempts: {}", attempts, error.details);
                break false;
            }
            attempts += 1;
            match session.handle_error(&error)? {
                Recovery::RestartLoad | Recovery::RecoverMedia => continue,
                Recovery::GiveUp | Recovery::Ignore => break false,
            }
        };

        if !(zap && finished_normally) || session.switch_channel(Direction::Next)?.is_none() {
            break;
        }
    }

    session.stop();
    Ok(())
}

fn print_grouped(list: &[&Channel]) {
    for (group, members) in channels::group_channels(list.iter().copied()) {
        println!("[{}]", group);
        for channel in members {
            println!("  {}  {}", channel.id, channel.name);
        }
    }
}

fn print_plain(list: &[&Channel]) {
    for channel in list {
        println!("{}  {}  [{}]", channel.id, channel.name, channel.group_label());
    }
}
