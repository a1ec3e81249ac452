use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tracksync::commands::{self, AppContext};
use tracksync::config::{AppConfig, CliConfig, FileConfig};
use tracksync::reconcile::Source;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
struct CliArgs {
    /// Path to a JSON file with the request headers to send to the catalog
    /// and streaming APIs.
    #[clap(long, value_parser = parse_path)]
    pub request_headers: PathBuf,

    /// Path to the track list file. Created if missing, resumed from if
    /// present.
    #[clap(long, value_parser = parse_path)]
    pub track_list: Option<PathBuf>,

    /// Path to an optional TOML config file; its values override CLI options.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Storefront country code for catalog requests.
    #[clap(long, default_value = "us")]
    pub country_code: String,

    /// Number of candidates to request per search query (1-10).
    #[clap(long, default_value_t = 3)]
    pub search_limit: usize,

    /// Seconds to wait before each API request.
    #[clap(long, default_value_t = 1)]
    pub request_delay_secs: u64,

    /// Ask for confirmation on artist mismatches instead of rejecting them.
    #[clap(long)]
    pub require_confirm: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge a local music folder into the track list and resolve it against
    /// the catalog.
    Local {
        /// Folder to scan recursively for audio files.
        #[clap(value_parser = parse_path)]
        folder: PathBuf,

        /// Index of the artist segment in each file path, negative counts
        /// from the end.
        #[clap(long, default_value_t = -2, allow_hyphen_values = true)]
        artist_path_position: i32,

        /// Index of the album segment in each file path, negative counts
        /// from the end.
        #[clap(long, default_value_t = -1, allow_hyphen_values = true)]
        album_path_position: i32,
    },

    /// Merge a streaming playlist export into the track list and resolve it
    /// against the catalog.
    Streaming {
        /// Playlist id to fetch, or "liked" for the saved-tracks collection.
        #[clap(default_value = "liked")]
        playlist: String,
    },

    /// Push resolved tracks from one source into the catalog library or a
    /// new playlist.
    Sync {
        /// Which source's tracks to sync.
        #[clap(long, value_enum)]
        source: Source,

        /// Add the resolved tracks to the library.
        #[clap(long)]
        add_to_library: bool,

        /// Create a playlist containing the resolved tracks.
        #[clap(long)]
        create_playlist: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        request_headers: cli_args.request_headers,
        track_list: cli_args.track_list,
        country_code: cli_args.country_code,
        search_limit: cli_args.search_limit,
        request_delay_secs: cli_args.request_delay_secs,
        require_confirm: cli_args.require_confirm,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let context = AppContext::initialize(config)?;
    let interrupted = context.interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
    })
    .context("failed to install the Ctrl-C handler")?;

    match cli_args.command {
        Command::Local {
            folder,
            artist_path_position,
            album_path_position,
        } => {
            commands::local::run(&context, &folder, artist_path_position, album_path_position)
                .await
        }
        Command::Streaming { playlist } => commands::streaming::run(&context, &playlist).await,
        Command::Sync {
            source,
            add_to_library,
            create_playlist,
        } => commands::sync::run(&context, source, add_to_library, create_playlist).await,
    }
}
