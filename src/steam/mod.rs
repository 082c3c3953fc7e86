mod client;
pub mod commands;
mod exports;
pub mod models;
mod playtime;

pub use client::{RecentGamesSource, SteamWebApi, STEAM_API_BASE};
pub use exports::SteamExports;
pub use models::{ExportSummary, GenerateResult, SteamDashboard, SteamGame, WeeklyActivity};
pub use playtime::{total_playtime, weekly_playtime};
