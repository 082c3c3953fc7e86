//! Steam export data models.
//!
//! Export files keep the snake_case layout the dashboard has always written;
//! API responses built from them use camelCase.

use serde::{Deserialize, Serialize};

/// One game from the recently-played list, optionally annotated with the
/// weekly delta once an export has been computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SteamGame {
    pub appid: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_2weeks: Option<u64>,
    /// Minutes.
    #[serde(default)]
    pub playtime_forever: u64,
    #[serde(default)]
    pub img_icon_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_delta: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_returning_game: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyActivity {
    #[serde(default)]
    pub games: Vec<SteamGame>,
    #[serde(default)]
    pub total_weekly_playtime: u64,
}

/// Contents of a `steam_dashboard_<date>.json` file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SteamDashboard {
    /// Kept as written; older exports carry local timestamps without an offset.
    pub timestamp: String,
    #[serde(default)]
    pub weekly_activity: WeeklyActivity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub date: String,
    pub timestamp: String,
    pub total_weekly_playtime: u64,
    pub games_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResult {
    pub success: bool,
    pub filename: String,
    pub games_count: usize,
    pub total_playtime: u64,
}
