//! Data models for the site scorer.
//!
//! This module contains the reference data types (locations and their
//! market attributes), the normalized readings produced by each open-data
//! source, and the report structures assembled at the end of a run.

use crate::dashboard::Dashboard;
use crate::scoring::{ClampPolicy, ScoreBreakdown};
use crate::sources::FetchedReadings;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Static market attributes for a location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketData {
    /// Metro population.
    pub population: u64,
    /// Median household income in USD.
    pub median_income: f64,
    /// Year-over-year employment growth, in percent.
    pub employment_growth: f64,
    /// New business permits issued in the last year.
    pub new_business_permits: u32,
}

/// Identifier of one of the supported locations.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LocationId {
    Austin,
    Miami,
    Denver,
    Phoenix,
}

impl LocationId {
    /// Every supported location, in display order.
    pub const ALL: [LocationId; 4] = [
        LocationId::Austin,
        LocationId::Miami,
        LocationId::Denver,
        LocationId::Phoenix,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationId::Austin => "austin",
            LocationId::Miami => "miami",
            LocationId::Denver => "denver",
            LocationId::Phoenix => "phoenix",
        }
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored site: identifier, display name, coordinates and market data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub id: LocationId,
    pub name: &'static str,
    pub coords: Coordinate,
    pub market: MarketData,
}

/// Direction of a measured activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Stable => write!(f, "stable"),
            Trend::Decreasing => write!(f, "decreasing"),
        }
    }
}

/// The external sources queried for every location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Satellite,
    Permits,
    Census,
    FootTraffic,
    Weather,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Satellite => write!(f, "Satellite"),
            SourceKind::Permits => write!(f, "Permits"),
            SourceKind::Census => write!(f, "Census"),
            SourceKind::FootTraffic => write!(f, "Foot Traffic"),
            SourceKind::Weather => write!(f, "Weather"),
        }
    }
}

/// Result of one source lookup: live data, or the fixed fallback and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceOutcome<T> {
    Live { reading: T },
    Fallback { reading: T, reason: String },
}

impl<T> SourceOutcome<T> {
    pub fn live(reading: T) -> Self {
        SourceOutcome::Live { reading }
    }

    pub fn fallback(reading: T, reason: impl Into<String>) -> Self {
        SourceOutcome::Fallback {
            reading,
            reason: reason.into(),
        }
    }

    /// The reading, whether it came from the source or the fallback.
    pub fn reading(&self) -> &T {
        match self {
            SourceOutcome::Live { reading } | SourceOutcome::Fallback { reading, .. } => reading,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, SourceOutcome::Live { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            SourceOutcome::Live { .. } => None,
            SourceOutcome::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Construction / land-change proxy for the area around a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatelliteReading {
    pub change_detected: bool,
    /// Estimated NDVI delta over the lookback window (negative means less vegetation).
    pub ndvi_change: f64,
    pub last_update: NaiveDate,
    pub construction_sites: usize,
    pub data_source: String,
}

/// Which strategy produced a permit reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitStrategyKind {
    LiveQuery,
    RandomizedPlaceholder,
}

impl fmt::Display for PermitStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermitStrategyKind::LiveQuery => write!(f, "live query"),
            PermitStrategyKind::RandomizedPlaceholder => write!(f, "randomized placeholder"),
        }
    }
}

/// A single permit summarized for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermitRecord {
    pub kind: String,
    pub date: String,
    pub value: String,
}

impl PermitRecord {
    /// The generic record used when no real permit details are available.
    pub fn generic() -> Self {
        Self {
            kind: "Commercial".to_string(),
            date: "Recent".to_string(),
            value: "N/A".to_string(),
        }
    }
}

/// Building permit activity near a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermitReading {
    pub count: usize,
    pub recent: Vec<PermitRecord>,
    pub trend: Trend,
    pub strategy: PermitStrategyKind,
}

/// Census geography identifiers for a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CensusReading {
    pub tract: String,
    pub block_group: String,
}

/// Foot-traffic estimate derived from amenity density.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FootTrafficReading {
    /// Weekly visits index, scaled to 0-100.
    pub weekly_visits: u32,
    pub trend: Trend,
    pub peak_hours: String,
}

/// Current weather conditions at a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReading {
    /// Air temperature at 2 m.
    pub temperature: f64,
    /// Precipitation in mm.
    pub precipitation: f64,
    /// Cloud cover in percent, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,
}

/// Everything computed for one location in a run.
#[derive(Debug, Clone, Serialize)]
pub struct LocationReport {
    pub location: Location,
    pub readings: FetchedReadings,
    pub score: ScoreBreakdown,
    pub dashboard: Dashboard,
}

/// Metadata about a scoring run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
    /// Model adjustment applied to the displayed scores.
    pub model: String,
    /// Configured percentile threshold.
    pub percentile: u8,
    pub clamp_policy: ClampPolicy,
    /// Whether network lookups were skipped.
    pub offline: bool,
    pub duration_seconds: f64,
}

/// The complete output of a scoring run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub locations: Vec<LocationReport>,
}

impl Report {
    /// Number of source lookups that fell back across all locations.
    pub fn fallback_count(&self) -> usize {
        self.locations
            .iter()
            .map(|l| l.readings.fallback_count())
            .sum()
    }
}
