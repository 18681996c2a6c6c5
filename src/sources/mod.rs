//! Open-data source clients.
//!
//! Each submodule queries one public endpoint and normalizes the response
//! into a fixed-shape reading. Lookups never fail from the caller's point of
//! view: any network, status or parse error is logged and replaced by the
//! source's fallback reading, tagged with the reason.

pub mod census;
pub mod foot_traffic;
pub mod permits;
pub mod satellite;
pub mod weather;

use crate::config::Config;
use crate::models::{
    CensusReading, FootTrafficReading, Location, PermitReading, SatelliteReading, SourceKind,
    SourceOutcome, WeatherReading,
};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from a single source lookup.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed (connect, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Unexpected status: {0}")]
    Status(reqwest::StatusCode),

    /// The response body did not have the expected shape.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// A required field was absent from the response.
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

/// Endpoints and request settings for the source clients.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub overpass_url: String,
    pub census_url: String,
    pub weather_url: String,
    pub austin_permits_url: String,
    pub miami_permits_url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
    /// Skip all requests and use fallbacks.
    pub offline: bool,
}

impl From<&Config> for SourceConfig {
    fn from(config: &Config) -> Self {
        Self {
            overpass_url: config.endpoints.overpass_url.clone(),
            census_url: config.endpoints.census_url.clone(),
            weather_url: config.endpoints.weather_url.clone(),
            austin_permits_url: config.endpoints.austin_permits_url.clone(),
            miami_permits_url: config.endpoints.miami_permits_url.clone(),
            timeout_seconds: config.network.timeout_seconds,
            user_agent: config.network.user_agent.clone(),
            offline: config.network.offline,
        }
    }
}

/// The five readings gathered for one location.
#[derive(Debug, Clone, Serialize)]
pub struct FetchedReadings {
    pub satellite: SourceOutcome<SatelliteReading>,
    pub permits: SourceOutcome<PermitReading>,
    pub census: SourceOutcome<CensusReading>,
    pub foot_traffic: SourceOutcome<FootTrafficReading>,
    pub weather: SourceOutcome<WeatherReading>,
}

impl FetchedReadings {
    /// Per-source status as (source, fallback reason) pairs.
    pub fn statuses(&self) -> [(SourceKind, Option<&str>); 5] {
        [
            (SourceKind::Satellite, self.satellite.fallback_reason()),
            (SourceKind::Permits, self.permits.fallback_reason()),
            (SourceKind::Census, self.census.fallback_reason()),
            (SourceKind::FootTraffic, self.foot_traffic.fallback_reason()),
            (SourceKind::Weather, self.weather.fallback_reason()),
        ]
    }

    /// Number of sources that answered with live data.
    pub fn live_count(&self) -> usize {
        [
            self.satellite.is_live(),
            self.permits.is_live(),
            self.census.is_live(),
            self.foot_traffic.is_live(),
            self.weather.is_live(),
        ]
        .into_iter()
        .filter(|live| *live)
        .count()
    }

    /// Number of sources that fell back.
    pub fn fallback_count(&self) -> usize {
        self.statuses().len() - self.live_count()
    }
}

/// Shared HTTP client for all open-data lookups.
pub struct SourceClient {
    http: reqwest::Client,
    config: SourceConfig,
}

impl SourceClient {
    /// Create a client whose requests all carry the configured timeout.
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self::with_http_client(config, http))
    }

    pub(crate) fn with_http_client(config: SourceConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Query all five sources for a location concurrently and wait for every one to settle.
    pub async fn fetch_all(&self, location: &Location) -> FetchedReadings {
        let coords = location.coords;
        debug!("Fetching all sources for {}", location.name);

        let (satellite, census, foot_traffic, weather, permits) = tokio::join!(
            self.fetch_satellite(coords),
            self.fetch_census(coords),
            self.fetch_foot_traffic(coords),
            self.fetch_weather(coords),
            self.fetch_permits(location.id, coords),
        );

        FetchedReadings {
            satellite,
            permits,
            census,
            foot_traffic,
            weather,
        }
    }

    /// Issue a GET and decode the body as JSON, rejecting non-success statuses.
    pub(crate) async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Value, SourceError> {
        let response = self.http.get(url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        let body: Value = response.json().await?;
        Ok(body)
    }

    /// Await a lookup, substituting the fallback on error or in offline mode.
    pub(crate) async fn resolve<T, Fut>(
        &self,
        kind: SourceKind,
        lookup: Fut,
        fallback: impl FnOnce() -> T,
    ) -> SourceOutcome<T>
    where
        Fut: Future<Output = Result<T, SourceError>>,
    {
        if self.config.offline {
            debug!("Offline mode, using {} fallback", kind);
            return SourceOutcome::fallback(fallback(), "offline mode");
        }

        match lookup.await {
            Ok(reading) => {
                debug!("{} lookup succeeded", kind);
                SourceOutcome::live(reading)
            }
            Err(e) => {
                warn!("Error fetching {} data, using fallback: {}", kind, e);
                SourceOutcome::fallback(fallback(), e.to_string())
            }
        }
    }
}
