use serde::{Deserialize, Serialize};

use crate::error::DiaryError;

/// A point on the map, validated from raw query parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn parse(lat: Option<&str>, lon: Option<&str>) -> Result<Self, DiaryError> {
        let (Some(lat), Some(lon)) = (non_blank(lat), non_blank(lon)) else {
            return Err(DiaryError::InvalidInput(
                "Latitude and longitude are required".into(),
            ));
        };

        let lat = parse_degrees("latitude", lat, 90.0)?;
        let lon = parse_degrees("longitude", lon, 180.0)?;
        Ok(Self { lat, lon })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_degrees(field: &str, raw: &str, limit: f64) -> Result<f64, DiaryError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value.abs() <= limit => Ok(value),
        _ => Err(DiaryError::InvalidInput(format!(
            "{field} must be a number between -{limit} and {limit}, got '{raw}'"
        ))),
    }
}

/// Current conditions, in the shape the diary editor inserts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub location: String,
    pub weather: String,
    /// Whole degrees Celsius.
    pub temperature: i64,
    pub feels_like: i64,
    /// Percent.
    pub humidity: i64,
    /// Metres per second.
    pub wind_speed: f64,
}

impl WeatherReport {
    /// Fixed conditions served when no OpenWeatherMap key is configured.
    pub fn demo(at: Coordinates) -> Self {
        Self {
            location: format!("{:.2}°, {:.2}°", at.lat, at.lon),
            weather: "Clear Sky".into(),
            temperature: 22,
            feels_like: 21,
            humidity: 60,
            wind_speed: 3.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requires_both_values() {
        assert!(Coordinates::parse(Some("52.5"), None).is_err());
        assert!(Coordinates::parse(None, Some("13.4")).is_err());
        let err = Coordinates::parse(Some(" "), Some("13.4")).unwrap_err();
        assert!(err.to_string().contains("Latitude and longitude are required"));
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert!(Coordinates::parse(Some("91"), Some("0")).is_err());
        assert!(Coordinates::parse(Some("0"), Some("-180.5")).is_err());
        assert!(Coordinates::parse(Some("north"), Some("0")).is_err());
        assert!(Coordinates::parse(Some("NaN"), Some("0")).is_err());

        let at = Coordinates::parse(Some("-33.87"), Some("151.21")).unwrap();
        assert_eq!(at, Coordinates { lat: -33.87, lon: 151.21 });
    }

    #[test]
    fn test_demo_report() {
        let report = WeatherReport::demo(Coordinates { lat: 52.52, lon: 13.4 });
        assert_eq!(report.location, "52.52°, 13.40°");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["feelsLike"], 21);
        assert_eq!(json["windSpeed"], 3.5);
    }
}
