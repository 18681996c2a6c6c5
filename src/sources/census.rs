//! US Census Bureau geography lookup.
//!
//! Resolves a coordinate to its census tract and block group using the free
//! `geographies/coordinates` endpoint. No API key required.

use super::{SourceClient, SourceError};
use crate::models::{CensusReading, Coordinate, SourceKind, SourceOutcome};
use serde_json::Value;

pub const BENCHMARK: &str = "Public_AR_Current";
pub const VINTAGE: &str = "Current_Current";

const NOT_AVAILABLE: &str = "N/A";

/// Reading used when the lookup fails.
pub fn fallback_reading() -> CensusReading {
    CensusReading {
        tract: "Fetching...".to_string(),
        block_group: "Fetching...".to_string(),
    }
}

/// Query parameters for a coordinate, rounded to four decimals.
pub fn coordinate_query(coords: Coordinate) -> Vec<(&'static str, String)> {
    vec![
        ("x", format!("{:.4}", coords.lng)),
        ("y", format!("{:.4}", coords.lat)),
        ("benchmark", BENCHMARK.to_string()),
        ("vintage", VINTAGE.to_string()),
        ("format", "json".to_string()),
    ]
}

/// Extract tract and block group GEOIDs from a geocoder response.
pub fn parse_geographies(body: &Value) -> Result<CensusReading, SourceError> {
    let result = body.get("result").ok_or(SourceError::MissingField("result"))?;
    let geographies = result.get("geographies");

    let geoid = |layer: &str| {
        geographies
            .and_then(|g| g.get(layer))
            .and_then(|l| l.get(0))
            .and_then(|entry| entry.get("GEOID"))
            .and_then(Value::as_str)
            .unwrap_or(NOT_AVAILABLE)
            .to_string()
    };

    Ok(CensusReading {
        tract: geoid("Census Tracts"),
        block_group: geoid("Census Block Groups"),
    })
}

impl SourceClient {
    /// Census tract and block group containing `coords`.
    pub async fn fetch_census(&self, coords: Coordinate) -> SourceOutcome<CensusReading> {
        self.resolve(
            SourceKind::Census,
            self.query_geographies(coords),
            fallback_reading,
        )
        .await
    }

    async fn query_geographies(&self, coords: Coordinate) -> Result<CensusReading, SourceError> {
        let body = self
            .get_json(&self.config.census_url, &coordinate_query(coords))
            .await?;
        parse_geographies(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_support::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer};

    #[test]
    fn test_parse_geographies() {
        let body = json!({
            "result": {
                "input": {},
                "geographies": {
                    "Census Tracts": [{"GEOID": "48453001817", "NAME": "Census Tract 18.17"}],
                    "Census Block Groups": [{"GEOID": "484530018171"}]
                }
            }
        });

        let reading = parse_geographies(&body).unwrap();
        assert_eq!(reading.tract, "48453001817");
        assert_eq!(reading.block_group, "484530018171");
    }

    #[test]
    fn test_missing_layers_are_not_available() {
        let body = json!({"result": {"geographies": {"Census Tracts": []}}});
        let reading = parse_geographies(&body).unwrap();
        assert_eq!(reading.tract, "N/A");
        assert_eq!(reading.block_group, "N/A");
    }

    #[test]
    fn test_missing_result_is_error() {
        let err = parse_geographies(&json!({"errors": ["bad"]})).unwrap_err();
        assert!(matches!(err, SourceError::MissingField("result")));
    }

    #[test]
    fn test_coordinate_query_rounds() {
        let query = coordinate_query(Coordinate::new(30.39904, -97.72151));
        assert_eq!(query[0], ("x", "-97.7215".to_string()));
        assert_eq!(query[1], ("y", "30.3990".to_string()));
        assert!(query.contains(&("benchmark", BENCHMARK.to_string())));
    }

    #[tokio::test]
    async fn test_fallback_literal() {
        let client = client_for(config_for(UNREACHABLE));
        let outcome = client.fetch_census(Coordinate::new(30.0, -97.0)).await;
        assert_eq!(outcome.reading(), &fallback_reading());
        assert!(outcome.fallback_reason().is_some());
    }

    #[tokio::test]
    async fn test_live_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("x", "-80.2000"))
            .and(query_param("y", "25.8000"))
            .and(query_param("benchmark", BENCHMARK))
            .and(query_param("vintage", VINTAGE))
            .and(query_param("format", "json"))
            .respond_with(json_response(
                200,
                r#"{"result":{"geographies":{"Census Tracts":[{"GEOID":"12086002402"}]}}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(config_for(&server.uri()));
        let outcome = client.fetch_census(Coordinate::new(25.8, -80.2)).await;
        assert!(outcome.is_live());
        assert_eq!(outcome.reading().tract, "12086002402");
    }
}
