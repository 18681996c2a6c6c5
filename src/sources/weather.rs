//! Current conditions from the Open-Meteo forecast API (no key required).

use super::{SourceClient, SourceError};
use crate::models::{Coordinate, SourceKind, SourceOutcome, WeatherReading};
use serde_json::Value;

pub const CURRENT_FIELDS: &str = "temperature_2m,precipitation,cloud_cover";

/// Reading used when the lookup fails.
pub fn fallback_reading() -> WeatherReading {
    WeatherReading {
        temperature: 72.0,
        precipitation: 0.0,
        cloud_cover: Some(25.0),
    }
}

pub fn forecast_query(coords: Coordinate) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", coords.lat.to_string()),
        ("longitude", coords.lng.to_string()),
        ("current", CURRENT_FIELDS.to_string()),
        ("timezone", "auto".to_string()),
    ]
}

/// Parse the `current` block. Temperature is required.
pub fn parse_current(body: &Value) -> Result<WeatherReading, SourceError> {
    let current = body
        .get("current")
        .ok_or(SourceError::MissingField("current"))?;

    let temperature = current
        .get("temperature_2m")
        .and_then(Value::as_f64)
        .ok_or(SourceError::MissingField("current.temperature_2m"))?;

    Ok(WeatherReading {
        temperature,
        precipitation: current
            .get("precipitation")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        cloud_cover: current.get("cloud_cover").and_then(Value::as_f64),
    })
}

impl SourceClient {
    pub async fn fetch_weather(&self, coords: Coordinate) -> SourceOutcome<WeatherReading> {
        self.resolve(
            SourceKind::Weather,
            self.query_current(coords),
            fallback_reading,
        )
        .await
    }

    async fn query_current(&self, coords: Coordinate) -> Result<WeatherReading, SourceError> {
        let body = self
            .get_json(&self.config.weather_url, &forecast_query(coords))
            .await?;
        parse_current(&body)
    }
}
