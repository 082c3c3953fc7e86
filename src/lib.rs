pub mod api;
pub mod autosave;
pub mod config;
pub mod db;
pub mod diary;
pub mod error;
pub mod labels;
pub mod session;
pub mod steam;
mod utils;
pub mod weather;

use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use config::Config;
use db::Database;
use diary::{EntryDate, FileContentStore};
use session::DiarySession;
use steam::{SteamExports, SteamWebApi};
use weather::WeatherService;

/// Everything the HTTP handlers need, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<FileContentStore>,
    pub db: Database,
    pub session: DiarySession<FileContentStore>,
    pub steam: Arc<SteamExports>,
    pub steam_api: Arc<SteamWebApi>,
    pub weather: Arc<WeatherService>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let db = Database::new(config.database_path.clone())?;
        let store = Arc::new(FileContentStore::new(config.diary_data_path.clone()));
        let session = DiarySession::new(Arc::clone(&store), config.autosave_delay());
        let steam_api =
            SteamWebApi::new(&config.steam_api_base).context("failed to set up Steam client")?;
        let weather = WeatherService::new(
            &config.weather_api_base,
            config.openweather_api_key.as_deref(),
        )
        .context("failed to set up weather client")?;
        if !weather.is_live() {
            info!("No OpenWeatherMap key configured, serving demo weather");
        }

        Ok(Self {
            steam: Arc::new(SteamExports::new(config.steam_export_dir.clone())),
            steam_api: Arc::new(steam_api),
            weather: Arc::new(weather),
            config: Arc::new(config),
            store,
            db,
            session,
        })
    }
}

pub async fn run() -> anyhow::Result<()> {
    // RUST_LOG still takes precedence over the level picked here
    env_logger::Builder::new()
        .filter_level(if config::debug_enabled() {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    info!("Daybook starting up...");

    let config = Config::load().context("failed to load configuration")?;
    info!(
        "Diary entries in {}, Steam exports in {}",
        config.diary_data_path.display(),
        config.steam_export_dir.display()
    );

    let http_addr = config.http_addr;
    let state = AppState::new(config)?;

    if let Err(err) = state.session.select(EntryDate::today()).await {
        warn!("Could not open today's entry: {err}");
    }

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested");
                    shutdown.cancel();
                }
                Err(err) => warn!("Failed to listen for Ctrl-C: {err}"),
            }
        });
    }

    api::serve(state.clone(), http_addr, shutdown).await?;

    // finish a running save, then write whatever the debounce timer still holds
    let snapshot = state.session.flush().await;
    if let Some(err) = &snapshot.save.error {
        warn!("Unsaved changes could not be written on shutdown: {err}");
    } else if snapshot.save.has_unsaved_changes {
        warn!("Shutting down with unsaved changes");
    }

    info!("Daybook stopped");
    Ok(())
}
