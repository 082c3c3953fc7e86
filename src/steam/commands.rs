use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    diary::EntryDate,
    error::DiaryError,
    steam::{ExportSummary, GenerateResult, SteamDashboard},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct ExportsResponse {
    pub exports: Vec<ExportSummary>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub export: SteamDashboard,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateRequest {
    pub api_key: String,
    pub steam_id: String,
}

pub async fn list_exports(
    State(state): State<AppState>,
) -> Result<Json<ExportsResponse>, DiaryError> {
    let exports = state.steam.list().await?;
    Ok(Json(ExportsResponse { exports }))
}

pub async fn get_export(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<ExportResponse>, DiaryError> {
    let date = EntryDate::parse(&date)?;
    let export = state.steam.read(&date).await?;
    Ok(Json(ExportResponse { export }))
}

pub async fn generate_export(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResult>, DiaryError> {
    let Json(request) = payload?;
    let result = state
        .steam
        .generate(
            state.steam_api.as_ref(),
            &request.api_key,
            &request.steam_id,
            EntryDate::today(),
            Utc::now(),
        )
        .await?;
    Ok(Json(result))
}
