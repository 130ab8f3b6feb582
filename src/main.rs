mod config;
mod database;
mod deezer;
mod entities;
mod input;
mod logging;
mod ports;
mod rate_limit;
mod services;
mod spotify_rs;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::{Result, eyre::Context, eyre::eyre};

use crate::{
    config::Config,
    database::DownloadDatabase,
    deezer::DeezerSession,
    input::read_ids_from_file,
    logging::setup_logging,
    ports::deezer::DeezerClient,
    rate_limit::AdmissionLimiter,
    services::arl::{ArlSearch, ArlSource, env_override, find_working_arl, trial_order},
    services::migrate::{MigrationPlan, MigrationReport, Migrator},
    spotify_rs::SpotifyApiClient,
};

/// Download Spotify playlists and albums from Deezer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// [CONFIG] <PLAYLISTS> <ALBUMS>: optional config file, then files listing
    /// Spotify playlists and albums, one per line
    #[arg(
        num_args = 2..=3,
        value_names = ["CONFIG", "PLAYLISTS", "ALBUMS"],
        required_unless_present_any = ["create_default_config", "config_path"]
    )]
    paths: Vec<PathBuf>,

    /// Enable debug logs
    #[arg(long)]
    debug: bool,

    /// Path to log file
    #[arg(long, env = "SPOTIRIP_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// File log level (default: debug)
    #[arg(long, default_value = "debug")]
    log_file_level: log::LevelFilter,

    /// Create a default config file, if it doesn't exist, and exit
    #[arg(long)]
    create_default_config: bool,

    /// Print the path to the default config file and exit
    #[arg(long)]
    config_path: bool,
}

struct Inputs {
    config: Option<PathBuf>,
    playlists: PathBuf,
    albums: PathBuf,
}

impl Inputs {
    fn from_paths(paths: Vec<PathBuf>) -> Result<Self> {
        let mut paths = paths.into_iter();
        match (paths.next(), paths.next(), paths.next()) {
            (Some(playlists), Some(albums), None) => Ok(Self {
                config: None,
                playlists,
                albums,
            }),
            (Some(config), Some(playlists), Some(albums)) => Ok(Self {
                config: Some(config),
                playlists,
                albums,
            }),
            _ => Err(eyre!("Expected [CONFIG] <PLAYLISTS> <ALBUMS>")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let level = if args.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    setup_logging(level, args.log_file.clone(), args.log_file_level)?;

    if args.config_path {
        match Config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("No default config path found"),
        }
        return Ok(());
    }
    if args.create_default_config {
        let path = Config::create_default()?;
        println!("{}", path.display());
        return Ok(());
    }

    let inputs = Inputs::from_paths(args.paths)?;

    log::debug!("Loading configuration");
    let config = {
        if let Some(path) = &inputs.config {
            Config::from_file(path)
        } else {
            Config::load()
        }
    }
    .wrap_err("Failed to load spotirip config")?;

    let plan = MigrationPlan {
        playlists: read_ids_from_file(&inputs.playlists)?,
        albums: read_ids_from_file(&inputs.albums)?,
    };

    let report = migrate(&config, &plan).await?;

    log::info!(
        "Finished: {} downloaded, {} skipped, {} not found on Deezer, {} failed",
        report.downloaded(),
        report.unavailable(),
        report.not_streamable.len(),
        report.failures()
    );

    for album in report.albums.iter().filter(|a| !a.failed.is_empty()) {
        log::warn!(
            "Album {} ({}): {} of its tracks failed",
            album.title,
            album.album_id,
            album.failed.len()
        );
    }

    if report.failures() > 0 {
        return Err(eyre!("{} downloads failed", report.failures()));
    }
    Ok(())
}

async fn migrate(config: &Config, plan: &MigrationPlan) -> Result<MigrationReport> {
    let source = ArlSource::new(config.arl().list_url.clone(), config.arl().fetch_timeout);
    let fetched = source
        .fetch_candidates()
        .await
        .wrap_err("Failed to retrieve ARLs")?;
    let candidates = trial_order(fetched, env_override());

    let database = Arc::new(DownloadDatabase::open(&config.download_folder()).await?);
    let deezer_config = config.deezer_config();

    let search = find_working_arl(candidates, |arl| {
        DeezerSession::connect(arl, deezer_config.clone(), database.clone())
    })
    .await
    .wrap_err("Failed to log into Deezer")?;

    let ArlSearch::Found { client, .. } = search else {
        return Err(eyre!(
            "No working ARL found; set {} to a valid ARL",
            services::arl::failover::ARL_ENV
        ));
    };

    let spotify_config = config.spotify_config()?;
    let spotify = SpotifyApiClient::new(spotify_config.client_id, spotify_config.client_secret);

    let rate_limit = config.rate_limit();
    let limiter = AdmissionLimiter::new(rate_limit.max_per_window, rate_limit.window);

    let result = Migrator::new(&client, &spotify, &limiter)
        .run(plan)
        .await
        .context("Migration failed");

    client.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_without_config() {
        let inputs = Inputs::from_paths(vec!["p.txt".into(), "a.txt".into()]).unwrap();

        assert!(inputs.config.is_none());
        assert_eq!(inputs.playlists, PathBuf::from("p.txt"));
        assert_eq!(inputs.albums, PathBuf::from("a.txt"));
    }

    #[test]
    fn test_inputs_with_config() {
        let inputs =
            Inputs::from_paths(vec!["c.toml".into(), "p.txt".into(), "a.txt".into()]).unwrap();

        assert_eq!(inputs.config, Some(PathBuf::from("c.toml")));
        assert_eq!(inputs.albums, PathBuf::from("a.txt"));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["spotirip", "--debug", "p.txt", "a.txt"]).unwrap();
        assert!(args.debug);
        assert_eq!(args.paths.len(), 2);

        assert!(Args::try_parse_from(["spotirip", "p.txt"]).is_err());
        assert!(Args::try_parse_from(["spotirip", "--config-path"]).is_ok());
    }
}
