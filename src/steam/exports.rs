use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::fs;

use crate::{diary::EntryDate, error::DiaryError};
use crate::{log_info, log_warn};

use super::{
    client::RecentGamesSource,
    models::{ExportSummary, GenerateResult, SteamDashboard, SteamGame, WeeklyActivity},
    playtime,
};

const ENABLE_LOGS: bool = true;

static EXPORT_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^steam_dashboard_(\d{4}-\d{2}-\d{2})\.json$").unwrap());

/// Directory of `steam_dashboard_<date>.json` exports.
#[derive(Debug, Clone)]
pub struct SteamExports {
    dir: PathBuf,
}

impl SteamExports {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn filename(date: &EntryDate) -> String {
        format!("steam_dashboard_{date}.json")
    }

    /// Export dates present on disk, newest first.
    async fn export_dates(&self) -> Result<Vec<String>, DiaryError> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(DiaryError::Io(err)),
        };

        let mut dates = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let name = item.file_name();
            if let Some(caps) = EXPORT_FILE_RE.captures(&name.to_string_lossy()) {
                dates.push(caps[1].to_string());
            }
        }
        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    async fn read_file(&self, date: &str) -> Result<SteamDashboard, DiaryError> {
        let path = self.dir.join(format!("steam_dashboard_{date}.json"));
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(DiaryError::NotFound(format!("Steam export for {date}")));
            }
            Err(err) => return Err(DiaryError::Io(err)),
        };
        serde_json::from_str(&content).map_err(|err| {
            DiaryError::Storage(format!("malformed Steam export {}: {err}", path.display()))
        })
    }

    /// Summaries of every readable export. Unreadable files are skipped.
    pub async fn list(&self) -> Result<Vec<ExportSummary>, DiaryError> {
        let mut summaries = Vec::new();
        for date in self.export_dates().await? {
            match self.read_file(&date).await {
                Ok(dashboard) => summaries.push(ExportSummary {
                    timestamp: dashboard.timestamp,
                    total_weekly_playtime: dashboard.weekly_activity.total_weekly_playtime,
                    games_count: dashboard.weekly_activity.games.len(),
                    date,
                }),
                Err(err) => log_warn!("Skipping Steam export {}: {}", date, err),
            }
        }
        Ok(summaries)
    }

    pub async fn read(&self, date: &EntryDate) -> Result<SteamDashboard, DiaryError> {
        self.read_file(&date.to_string()).await
    }

    /// Games from the newest export dated before `date`, if any can be read.
    pub async fn previous_games(&self, date: &EntryDate) -> Option<Vec<SteamGame>> {
        let date = date.to_string();
        let dates = match self.export_dates().await {
            Ok(dates) => dates,
            Err(err) => {
                log_warn!("Failed to list Steam exports: {}", err);
                return None;
            }
        };
        let previous = dates.into_iter().find(|candidate| *candidate < date)?;

        match self.read_file(&previous).await {
            Ok(dashboard) => Some(dashboard.weekly_activity.games),
            Err(err) => {
                log_warn!("Failed to load previous Steam export {}: {}", previous, err);
                None
            }
        }
    }

    pub async fn write(
        &self,
        date: &EntryDate,
        dashboard: &SteamDashboard,
    ) -> Result<String, DiaryError> {
        fs::create_dir_all(&self.dir).await?;
        let filename = Self::filename(date);
        let serialized = serde_json::to_string_pretty(dashboard)
            .map_err(|err| DiaryError::Storage(format!("failed to encode Steam export: {err}")))?;
        fs::write(self.dir.join(&filename), serialized).await?;
        Ok(filename)
    }

    /// Fetch recent games, diff them against the previous export and write
    /// the export for `date`.
    pub async fn generate<R: RecentGamesSource>(
        &self,
        source: &R,
        api_key: &str,
        steam_id: &str,
        date: EntryDate,
        now: DateTime<Utc>,
    ) -> Result<GenerateResult, DiaryError> {
        if api_key.trim().is_empty() || steam_id.trim().is_empty() {
            return Err(DiaryError::InvalidInput(
                "API key and Steam ID are required".into(),
            ));
        }

        let current = source.recently_played(api_key, steam_id).await?;
        let previous = self.previous_games(&date).await;
        let games = playtime::weekly_playtime(current, previous.as_deref());
        let total = playtime::total_playtime(&games);

        let dashboard = SteamDashboard {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            weekly_activity: WeeklyActivity {
                total_weekly_playtime: total,
                games,
            },
        };
        let filename = self.write(&date, &dashboard).await?;
        log_info!(
            "Wrote Steam export {} ({} games, {} minutes)",
            filename,
            dashboard.weekly_activity.games.len(),
            total
        );

        Ok(GenerateResult {
            success: true,
            filename,
            games_count: dashboard.weekly_activity.games.len(),
            total_playtime: total,
        })
    }
}
