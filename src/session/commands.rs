use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    diary::EntryDate,
    error::DiaryError,
    labels::LabelRepository,
    session::SessionSnapshot,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateRequest {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LabelIdsBody {
    pub ids: Vec<String>,
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot().await)
}

pub async fn select_entry(
    State(state): State<AppState>,
    payload: Result<Json<SelectRequest>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, DiaryError> {
    let Json(request) = payload?;
    let date = EntryDate::parse(&request.date)?;
    Ok(Json(state.session.select(date).await?))
}

/// Without a date (or without a body at all), today's entry is created.
pub async fn create_entry(
    State(state): State<AppState>,
    payload: Result<Option<Json<CreateRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionSnapshot>), DiaryError> {
    let request = payload?.map(|Json(request)| request).unwrap_or_default();
    let date = match request.date.as_deref() {
        Some(value) => EntryDate::parse(value)?,
        None => EntryDate::today(),
    };
    let snapshot = state.session.create_entry(date).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn update_content(
    State(state): State<AppState>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, DiaryError> {
    let Json(request) = payload?;
    Ok(Json(state.session.edit(request.content).await))
}

pub async fn save_now(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.save_now().await)
}

pub async fn get_labels(State(state): State<AppState>) -> Json<LabelIdsBody> {
    Json(LabelIdsBody {
        ids: state.session.labels().await,
    })
}

pub async fn set_labels(
    State(state): State<AppState>,
    payload: Result<Json<LabelIdsBody>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, DiaryError> {
    let Json(body) = payload?;
    if body.ids.iter().any(|id| id.trim().is_empty()) {
        return Err(DiaryError::InvalidInput("Label ids must not be empty".into()));
    }
    let catalog = state.db.list().await?;
    Ok(Json(state.session.set_labels(&body.ids, &catalog).await))
}
