use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    error::DiaryError,
    labels::{Label, LabelInput, LabelRepository, LabelUpdate},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct LabelsResponse {
    pub labels: Vec<Label>,
}

#[derive(Debug, Serialize)]
pub struct LabelResponse {
    pub label: Label,
}

pub async fn get_labels(State(state): State<AppState>) -> Result<Json<LabelsResponse>, DiaryError> {
    let labels = state.db.list().await?;
    Ok(Json(LabelsResponse { labels }))
}

pub async fn create_label(
    State(state): State<AppState>,
    payload: Result<Json<LabelInput>, JsonRejection>,
) -> Result<(StatusCode, Json<LabelResponse>), DiaryError> {
    let Json(input) = payload?;
    let label = state.db.create(input).await?;
    Ok((StatusCode::CREATED, Json(LabelResponse { label })))
}

pub async fn update_label(
    State(state): State<AppState>,
    Path(label_id): Path<String>,
    payload: Result<Json<LabelUpdate>, JsonRejection>,
) -> Result<Json<LabelResponse>, DiaryError> {
    let Json(update) = payload?;
    let label = state.db.update(&label_id, update).await?;
    Ok(Json(LabelResponse { label }))
}

pub async fn delete_label(
    State(state): State<AppState>,
    Path(label_id): Path<String>,
) -> Result<StatusCode, DiaryError> {
    state.db.delete(&label_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
