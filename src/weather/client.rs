use std::{future::Future, time::Duration};

use reqwest::Client;
use serde::Deserialize;

use crate::error::DiaryError;

use super::models::{Coordinates, WeatherReport};

pub const OPENWEATHER_API_BASE: &str = "https://api.openweathermap.org";

/// Where current conditions come from.
pub trait WeatherSource: Send + Sync + 'static {
    fn current(
        &self,
        at: Coordinates,
    ) -> impl Future<Output = Result<WeatherReport, DiaryError>> + Send;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CurrentWeather {
    name: Option<String>,
    sys: Option<CountryInfo>,
    weather: Vec<Condition>,
    main: Option<Readings>,
    wind: Option<Wind>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CountryInfo {
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Condition {
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Readings {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Wind {
    speed: f64,
}

impl From<CurrentWeather> for WeatherReport {
    fn from(data: CurrentWeather) -> Self {
        let country = data.sys.and_then(|sys| sys.country).unwrap_or_default();
        let readings = data.main.unwrap_or_default();
        Self {
            location: format!(
                "{}, {}",
                data.name.as_deref().unwrap_or("Unknown"),
                country
            ),
            weather: data
                .weather
                .into_iter()
                .next()
                .and_then(|condition| condition.description)
                .unwrap_or_else(|| "Unknown".into()),
            temperature: readings.temp.round() as i64,
            feels_like: readings.feels_like.round() as i64,
            humidity: readings.humidity.round() as i64,
            wind_speed: data.wind.map(|wind| wind.speed).unwrap_or_default(),
        }
    }
}

/// OpenWeatherMap current-weather client, metric units.
pub struct OpenWeatherApi {
    base_url: String,
    api_key: String,
    http: Client,
}

impl OpenWeatherApi {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, DiaryError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DiaryError::Upstream(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }
}

impl WeatherSource for OpenWeatherApi {
    async fn current(&self, at: Coordinates) -> Result<WeatherReport, DiaryError> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| DiaryError::Upstream(format!("Weather request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(DiaryError::Upstream(format!(
                "OpenWeatherMap returned {}",
                resp.status()
            )));
        }

        let data: CurrentWeather = resp
            .json()
            .await
            .map_err(|e| DiaryError::Upstream(format!("Failed to parse weather response: {e}")))?;
        Ok(data.into())
    }
}

/// Live lookups when an API key is configured, fixed demo data otherwise.
pub enum WeatherService {
    Live(OpenWeatherApi),
    Demo,
}

impl WeatherService {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, DiaryError> {
        match api_key.map(str::trim).filter(|key| !key.is_empty()) {
            Some(key) => Ok(Self::Live(OpenWeatherApi::new(base_url, key)?)),
            None => Ok(Self::Demo),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

impl WeatherSource for WeatherService {
    async fn current(&self, at: Coordinates) -> Result<WeatherReport, DiaryError> {
        match self {
            Self::Live(api) => api.current(at).await,
            Self::Demo => Ok(WeatherReport::demo(at)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    const BERLIN: Coordinates = Coordinates { lat: 52.52, lon: 13.4 };

    #[tokio::test]
    async fn test_current_formats_response() {
        let router = Router::new().route(
            "/data/2.5/weather",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("appid").map(String::as_str), Some("secret"));
                assert_eq!(params.get("units").map(String::as_str), Some("metric"));
                assert_eq!(params.get("lat").map(String::as_str), Some("52.52"));
                Json(serde_json::json!({
                    "name": "Berlin",
                    "sys": { "country": "DE" },
                    "weather": [{ "main": "Clouds", "description": "broken clouds" }],
                    "main": { "temp": 17.6, "feels_like": 17.2, "humidity": 71 },
                    "wind": { "speed": 4.1 }
                }))
            }),
        );
        let service = WeatherService::new(&serve(router).await, Some("secret")).unwrap();
        assert!(service.is_live());

        let report = service.current(BERLIN).await.unwrap();
        assert_eq!(report.location, "Berlin, DE");
        assert_eq!(report.weather, "broken clouds");
        assert_eq!(report.temperature, 18);
        assert_eq!(report.feels_like, 17);
        assert_eq!(report.humidity, 71);
        assert_eq!(report.wind_speed, 4.1);
    }

    #[tokio::test]
    async fn test_sparse_response_uses_placeholders() {
        let router = Router::new().route(
            "/data/2.5/weather",
            get(|| async { Json(serde_json::json!({})) }),
        );
        let api = OpenWeatherApi::new(&serve(router).await, "secret").unwrap();

        let report = api.current(BERLIN).await.unwrap();
        assert_eq!(report.location, "Unknown, ");
        assert_eq!(report.weather, "Unknown");
        assert_eq!(report.temperature, 0);
        assert_eq!(report.wind_speed, 0.0);
    }

    #[tokio::test]
    async fn test_rejected_key_is_upstream_error() {
        let router = Router::new().route(
            "/data/2.5/weather",
            get(|| async { StatusCode::UNAUTHORIZED }),
        );
        let api = OpenWeatherApi::new(&serve(router).await, "wrong").unwrap();
        let err = api.current(BERLIN).await.unwrap_err();
        assert!(matches!(err, DiaryError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_without_key_serves_demo_data() {
        let service = WeatherService::new(OPENWEATHER_API_BASE, Some("  ")).unwrap();
        assert!(!service.is_live());
        let report = service.current(BERLIN).await.unwrap();
        assert_eq!(report, WeatherReport::demo(BERLIN));
    }
}
