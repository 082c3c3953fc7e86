use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::DiaryError,
    weather::{Coordinates, WeatherReport, WeatherSource},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WeatherQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

pub async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherReport>, DiaryError> {
    let at = Coordinates::parse(query.lat.as_deref(), query.lon.as_deref())?;
    let report = state.weather.current(at).await?;
    Ok(Json(report))
}
