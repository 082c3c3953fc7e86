use std::{future::Future, time::Duration};

use reqwest::Client;
use serde::Deserialize;

use crate::error::DiaryError;

use super::models::SteamGame;

pub const STEAM_API_BASE: &str = "https://api.steampowered.com";

/// Where recently played games come from.
pub trait RecentGamesSource: Send + Sync + 'static {
    fn recently_played(
        &self,
        api_key: &str,
        steam_id: &str,
    ) -> impl Future<Output = Result<Vec<SteamGame>, DiaryError>> + Send;
}

#[derive(Debug, Default, Deserialize)]
struct RecentlyPlayedEnvelope {
    #[serde(default)]
    response: RecentlyPlayedResponse,
}

#[derive(Debug, Default, Deserialize)]
struct RecentlyPlayedResponse {
    #[serde(default)]
    games: Vec<SteamGame>,
}

/// Minimal Steam Web API client.
pub struct SteamWebApi {
    base_url: String,
    http: Client,
}

impl SteamWebApi {
    pub fn new(base_url: &str) -> Result<Self, DiaryError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| DiaryError::Upstream(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RecentGamesSource for SteamWebApi {
    async fn recently_played(
        &self,
        api_key: &str,
        steam_id: &str,
    ) -> Result<Vec<SteamGame>, DiaryError> {
        let url = format!(
            "{}/IPlayerService/GetRecentlyPlayedGames/v0001/",
            self.base_url
        );
        let resp = self
            .http
            .get(&url)
            .query(&[("key", api_key), ("steamid", steam_id), ("format", "json")])
            .send()
            .await
            .map_err(|e| DiaryError::Upstream(format!("Steam request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(DiaryError::Upstream(format!(
                "Steam API returned {}",
                resp.status()
            )));
        }

        let envelope: RecentlyPlayedEnvelope = resp
            .json()
            .await
            .map_err(|e| DiaryError::Upstream(format!("Failed to parse Steam response: {e}")))?;
        Ok(envelope.response.games)
    }
}
