use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    diary::{ContentStore, DiaryEntry, EntryDate},
    error::DiaryError,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct DiaryListResponse {
    pub diaries: Vec<DiaryEntry>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DiaryContentResponse {
    pub entry: DiaryEntry,
}

#[derive(Debug, Deserialize)]
pub struct SaveDiaryRequest {
    pub content: String,
}

pub async fn list_diaries(
    State(state): State<AppState>,
) -> Result<Json<DiaryListResponse>, DiaryError> {
    let diaries = state.store.list().await?;
    Ok(Json(DiaryListResponse {
        total: diaries.len(),
        diaries,
    }))
}

pub async fn get_diary(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DiaryContentResponse>, DiaryError> {
    let date = EntryDate::parse(&date)?;
    let content = state.store.read(&date).await?;
    Ok(Json(DiaryContentResponse {
        entry: DiaryEntry::with_content(date, content),
    }))
}

pub async fn create_diary(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<(StatusCode, Json<DiaryContentResponse>), DiaryError> {
    let date = EntryDate::parse(&date)?;
    state.session.create(date).await?;
    Ok((
        StatusCode::CREATED,
        Json(DiaryContentResponse {
            entry: DiaryEntry::with_content(date, String::new()),
        }),
    ))
}

/// Creates the entry when it does not exist yet. Writing the entry open in
/// the session replaces its editor state.
pub async fn save_diary(
    State(state): State<AppState>,
    Path(date): Path<String>,
    payload: Result<Json<SaveDiaryRequest>, JsonRejection>,
) -> Result<Json<DiaryContentResponse>, DiaryError> {
    let date = EntryDate::parse(&date)?;
    let Json(request) = payload?;
    state
        .session
        .write_entry(date, request.content.clone())
        .await?;
    Ok(Json(DiaryContentResponse {
        entry: DiaryEntry::with_content(date, request.content),
    }))
}

pub async fn delete_diary(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<StatusCode, DiaryError> {
    let date = EntryDate::parse(&date)?;
    state.session.delete_entry(date).await?;
    Ok(StatusCode::NO_CONTENT)
}
