//! Foot-traffic estimate from OpenStreetMap amenity density.

use super::{SourceClient, SourceError};
use crate::geo::BoundingBox;
use crate::models::{Coordinate, FootTrafficReading, SourceKind, SourceOutcome, Trend};
use serde_json::Value;

/// Half-width of the search box in degrees (about 1 km).
pub const BBOX_HALF_WIDTH: f64 = 0.01;

pub const PEAK_HOURS: &str = "12pm-2pm, 6pm-8pm";

/// Reading used when the lookup fails.
pub fn fallback_reading() -> FootTrafficReading {
    FootTrafficReading {
        weekly_visits: 78,
        trend: Trend::Increasing,
        peak_hours: PEAK_HOURS.to_string(),
    }
}

/// Overpass QL counting amenity nodes and ways in `bbox`.
pub fn amenity_query(bbox: &BoundingBox) -> String {
    let b = bbox.to_overpass();
    format!("[out:json];(node[\"amenity\"]({b});way[\"amenity\"]({b}););out count;")
}

/// Points of interest in an Overpass response.
///
/// `out count` yields one `count` element whose `total` tag carries the
/// number; plain element lists are counted directly.
pub fn poi_count(body: &Value) -> Result<u64, SourceError> {
    let elements = body
        .get("elements")
        .and_then(Value::as_array)
        .ok_or(SourceError::MissingField("elements"))?;

    let total = elements
        .iter()
        .find(|e| e.get("type").and_then(Value::as_str) == Some("count"))
        .and_then(|e| e.pointer("/tags/total"))
        .and_then(|t| match t {
            Value::String(s) => s.parse::<u64>().ok(),
            other => other.as_u64(),
        });

    Ok(total.unwrap_or(elements.len() as u64))
}

/// Scale a POI count to the 0-100 weekly visits index.
pub fn estimate(poi_count: u64) -> FootTrafficReading {
    let weekly_visits = (poi_count as f64 * 2.5).floor().min(100.0) as u32;

    FootTrafficReading {
        weekly_visits,
        trend: if poi_count > 50 {
            Trend::Increasing
        } else {
            Trend::Stable
        },
        peak_hours: PEAK_HOURS.to_string(),
    }
}

impl SourceClient {
    /// Foot-traffic index for the area around `coords`.
    pub async fn fetch_foot_traffic(
        &self,
        coords: Coordinate,
    ) -> SourceOutcome<FootTrafficReading> {
        self.resolve(
            SourceKind::FootTraffic,
            self.query_amenities(coords),
            fallback_reading,
        )
        .await
    }

    async fn query_amenities(&self, coords: Coordinate) -> Result<FootTrafficReading, SourceError> {
        let bbox = BoundingBox::around(coords, BBOX_HALF_WIDTH);
        let query = [("data", amenity_query(&bbox))];
        let body = self.get_json(&self.config.overpass_url, &query).await?;
        Ok(estimate(poi_count(&body)?))
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
    fn test_count_element_total() {
        let body = json!({
            "elements": [{
                "type": "count",
                "id": 0,
                "tags": {"nodes": "30", "ways": "4", "relations": "0", "total": "34"}
            }]
        });
        assert_eq!(poi_count(&body).unwrap(), 34);
    }

    #[test]
    fn test_plain_elements_counted() {
        let body = json!({"elements": [{"type": "node"}, {"type": "node"}, {"type": "way"}]});
        assert_eq!(poi_count(&body).unwrap(), 3);
    }

    #[test]
    fn test_missing_elements_is_error() {
        assert!(poi_count(&json!({})).is_err());
    }

    #[test]
    fn test_estimate_scaling() {
        assert_eq!(estimate(0).weekly_visits, 0);
        assert_eq!(estimate(3).weekly_visits, 7);
        assert_eq!(estimate(34).weekly_visits, 85);
        assert_eq!(estimate(40).weekly_visits, 100);
        assert_eq!(estimate(1000).weekly_visits, 100);
    }

    #[test]
    fn test_estimate_trend() {
        assert_eq!(estimate(50).trend, Trend::Stable);
        assert_eq!(estimate(51).trend, Trend::Increasing);
        assert_eq!(estimate(51).peak_hours, PEAK_HOURS);
    }

    #[test]
    fn test_query_format() {
        let bbox = BoundingBox::around(Coordinate::new(1.0, 2.0), 0.5);
        assert_eq!(
            amenity_query(&bbox),
            "[out:json];(node[\"amenity\"](0.5,1.5,1.5,2.5);way[\"amenity\"](0.5,1.5,1.5,2.5););out count;"
        );
    }

    #[tokio::test]
    async fn test_fallback_literal() {
        let client = client_for(config_for(UNREACHABLE));
        let outcome = client.fetch_foot_traffic(Coordinate::new(30.0, -97.0)).await;
        assert_eq!(outcome.reading(), &fallback_reading());
        assert_eq!(outcome.reading().weekly_visits, 78);
    }

    #[tokio::test]
    async fn test_live_lookup() {
        let coords = Coordinate::new(30.0, -97.0);
        let expected = amenity_query(&BoundingBox::around(coords, BBOX_HALF_WIDTH));
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("data", expected.as_str()))
            .respond_with(json_response(
                200,
                r#"{"elements":[{"type":"count","id":0,"tags":{"total":"12"}}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(config_for(&server.uri()));
        let outcome = client.fetch_foot_traffic(coords).await;
        assert!(outcome.is_live());
        assert_eq!(outcome.reading().weekly_visits, 30);
        assert_eq!(outcome.reading().trend, Trend::Stable);
    }
}
