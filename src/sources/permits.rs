//! Building permit activity.
//!
//! Austin and Miami publish permit datasets on Socrata portals, which are
//! queried and filtered to permits within five miles of the site. Denver and
//! Phoenix have no compatible feed; their counts come from a randomized
//! placeholder, and every reading records which strategy produced it.

use super::{SourceClient, SourceConfig, SourceError};
use crate::geo::distance_miles;
use crate::models::{
    Coordinate, LocationId, PermitReading, PermitRecord, PermitStrategyKind, SourceKind,
    SourceOutcome, Trend,
};
use rand::Rng;
use serde_json::Value;
use tracing::debug;

/// Permits farther than this from the site are ignored.
pub const NEARBY_RADIUS_MILES: f64 = 5.0;

/// Number of permits kept for display.
pub const RECENT_LIMIT: usize = 5;

/// Rows requested from a permit dataset.
pub const QUERY_LIMIT: u32 = 500;

/// A Socrata permit dataset and the fields used from its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitDataset {
    pub url: String,
    pub kind_field: &'static str,
    pub date_field: &'static str,
    pub value_field: &'static str,
}

impl PermitDataset {
    /// Query parameters: newest first, capped at [`QUERY_LIMIT`].
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("$limit", QUERY_LIMIT.to_string()),
            ("$order", format!("{} DESC", self.date_field)),
        ]
    }
}

/// How permit counts are obtained for a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermitStrategy {
    /// Count real permits from an open-data feed.
    LiveQuery(PermitDataset),
    /// Draw a plausible count at random.
    RandomizedPlaceholder,
}

impl PermitStrategy {
    /// Strategy used for each location.
    pub fn for_location(id: LocationId, config: &SourceConfig) -> Self {
        match id {
            LocationId::Austin => PermitStrategy::LiveQuery(PermitDataset {
                url: config.austin_permits_url.clone(),
                kind_field: "work_class",
                date_field: "issue_date",
                value_field: "total_existing_bldg_sqft",
            }),
            LocationId::Miami => PermitStrategy::LiveQuery(PermitDataset {
                url: config.miami_permits_url.clone(),
                kind_field: "permit_type",
                date_field: "application_date",
                value_field: "job_value",
            }),
            LocationId::Denver | LocationId::Phoenix => PermitStrategy::RandomizedPlaceholder,
        }
    }

    pub fn kind(&self) -> PermitStrategyKind {
        match self {
            PermitStrategy::LiveQuery(_) => PermitStrategyKind::LiveQuery,
            PermitStrategy::RandomizedPlaceholder => PermitStrategyKind::RandomizedPlaceholder,
        }
    }
}

/// Trend bucket for a nearby permit count.
pub fn trend_for_count(count: usize) -> Trend {
    if count > 35 {
        Trend::Increasing
    } else if count > 20 {
        Trend::Stable
    } else {
        Trend::Decreasing
    }
}

/// Reading used when the lookup fails, tagged with the strategy that was attempted.
pub fn fallback_reading(strategy: PermitStrategyKind) -> PermitReading {
    PermitReading {
        count: 42,
        recent: vec![PermitRecord::generic()],
        trend: Trend::Stable,
        strategy,
    }
}

/// Random count in [25, 85) with a single generic record.
pub fn placeholder_reading<R: Rng + ?Sized>(rng: &mut R) -> PermitReading {
    let count = rng.gen_range(25..85);
    PermitReading {
        count,
        recent: vec![PermitRecord::generic()],
        trend: trend_for_count(count),
        strategy: PermitStrategyKind::RandomizedPlaceholder,
    }
}

/// Coordinate fields arrive as strings or numbers depending on the portal.
fn number_field(record: &Value, field: &str) -> Option<f64> {
    let value = match record.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite() && *v != 0.0)
}

fn text_field(record: &Value, field: &str, default: &str) -> String {
    match record.get(field) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => default.to_string(),
    }
}

/// Filter dataset records to those near `center` and summarize them.
pub fn nearby_permits(
    records: &[Value],
    center: Coordinate,
    dataset: &PermitDataset,
) -> PermitReading {
    let nearby: Vec<&Value> = records
        .iter()
        .filter(|record| {
            match (
                number_field(record, "latitude"),
                number_field(record, "longitude"),
            ) {
                (Some(lat), Some(lng)) => {
                    distance_miles(center, Coordinate::new(lat, lng)) < NEARBY_RADIUS_MILES
                }
                _ => false,
            }
        })
        .collect();

    let recent = nearby
        .iter()
        .take(RECENT_LIMIT)
        .map(|record| PermitRecord {
            kind: text_field(record, dataset.kind_field, "Commercial"),
            date: text_field(record, dataset.date_field, "Recent"),
            value: text_field(record, dataset.value_field, "N/A"),
        })
        .collect();

    PermitReading {
        count: nearby.len(),
        recent,
        trend: trend_for_count(nearby.len()),
        strategy: PermitStrategyKind::LiveQuery,
    }
}

impl SourceClient {
    /// Permit activity around a location, using that location's strategy.
    pub async fn fetch_permits(
        &self,
        id: LocationId,
        coords: Coordinate,
    ) -> SourceOutcome<PermitReading> {
        let strategy = PermitStrategy::for_location(id, &self.config);
        let kind = strategy.kind();
        debug!("Permit strategy for {}: {}", id, kind);

        self.resolve(
            SourceKind::Permits,
            self.query_permits(strategy, coords),
            || fallback_reading(kind),
        )
        .await
    }

    async fn query_permits(
        &self,
        strategy: PermitStrategy,
        coords: Coordinate,
    ) -> Result<PermitReading, SourceError> {
        match strategy {
            PermitStrategy::LiveQuery(dataset) => {
                let body = self.get_json(&dataset.url, &dataset.query()).await?;
                let records = body.as_array().ok_or_else(|| SourceError::Parse {
                    message: "expected a JSON array of permit records".to_string(),
                })?;
                Ok(nearby_permits(records, coords, &dataset))
            }
            PermitStrategy::RandomizedPlaceholder => {
                Ok(placeholder_reading(&mut rand::thread_rng()))
            }
        }
    }
}
