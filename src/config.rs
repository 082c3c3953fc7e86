//! Process configuration.
//!
//! Read from a JSON file (path in `DAYBOOK_CONFIG`, default `daybook.json`),
//! then overridden field by field from the environment. Every setting has a
//! default so the service starts with no configuration at all.

use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{steam::STEAM_API_BASE, weather::OPENWEATHER_API_BASE};

pub const CONFIG_PATH_ENV: &str = "DAYBOOK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "daybook.json";

/// `DAYBOOK_DEBUG=1` (or `true`) turns on debug logging. Read before the
/// config file so that loading it can already be logged.
pub fn debug_enabled() -> bool {
    std::env::var("DAYBOOK_DEBUG")
        .map(|value| is_truthy(&value))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Directory holding `<date>_public.md` entries.
    /// Env: `DIARY_DATA_PATH`
    pub diary_data_path: PathBuf,

    /// Directory holding `steam_dashboard_<date>.json` exports.
    /// Env: `STEAM_EXPORT_DIR`
    pub steam_export_dir: PathBuf,

    /// SQLite file for the label catalog.
    /// Env: `DAYBOOK_DB_PATH`
    pub database_path: PathBuf,

    /// Env: `DAYBOOK_HTTP_ADDR`
    pub http_addr: SocketAddr,

    /// Quiet period after the last edit before an automatic save.
    /// Env: `DAYBOOK_AUTOSAVE_MS`
    pub autosave_delay_ms: u64,

    pub steam_api_base: String,

    /// Without a key the weather endpoint answers with demo data.
    /// Env: `OPENWEATHER_API_KEY`
    pub openweather_api_key: Option<String>,

    pub weather_api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            diary_data_path: PathBuf::from("./data/diary"),
            steam_export_dir: PathBuf::from("./data/steam_export"),
            database_path: PathBuf::from("./data/daybook.sqlite3"),
            http_addr: ([127, 0, 0, 1], 3000).into(),
            autosave_delay_ms: 1000,
            steam_api_base: STEAM_API_BASE.to_string(),
            openweather_api_key: None,
            weather_api_base: OPENWEATHER_API_BASE.to_string(),
        }
    }
}

impl Config {
    /// File named by `DAYBOOK_CONFIG`, then process environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// A missing file yields the defaults. So does an unparsable one, with a
    /// warning, rather than refusing to start.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!("Ignoring malformed config {}: {err}", path.display());
            Self::default()
        }))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("DIARY_DATA_PATH") {
            self.diary_data_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("STEAM_EXPORT_DIR") {
            self.steam_export_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("DAYBOOK_DB_PATH") {
            self.database_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("DAYBOOK_HTTP_ADDR") {
            self.http_addr = value
                .parse()
                .with_context(|| format!("DAYBOOK_HTTP_ADDR is not a socket address: {value}"))?;
        }
        if let Some(value) = lookup("OPENWEATHER_API_KEY") {
            self.openweather_api_key = Some(value);
        }
        if let Some(value) = lookup("DAYBOOK_AUTOSAVE_MS") {
            self.autosave_delay_ms = value
                .parse()
                .with_context(|| format!("DAYBOOK_AUTOSAVE_MS is not a number: {value}"))?;
        }
        Ok(())
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}
