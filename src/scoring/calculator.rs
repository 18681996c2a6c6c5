//! Weighted site score.
//!
//! Combines a location's market attributes with the foot-traffic index:
//!
//! ```text
//! income  = min(100, median_income / 1000 * 1.2)
//! growth  = employment_growth * 20
//! permits = min(100, new_business_permits / 15)
//! traffic = weekly_visits
//! final   = income*0.25 + growth*0.30 + permits*0.25 + traffic*0.20
//! ```
//!
//! `growth` has no upper bound, so the weighted sum can exceed 100 for growth
//! rates above 5%. [`ClampPolicy`] decides whether the final value is bounded.

use crate::models::{FootTrafficReading, MarketData};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const INCOME_WEIGHT: f64 = 0.25;
pub const GROWTH_WEIGHT: f64 = 0.30;
pub const PERMIT_WEIGHT: f64 = 0.25;
pub const TRAFFIC_WEIGHT: f64 = 0.20;

/// Whether the final score is bounded to [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClampPolicy {
    #[default]
    Clamp,
    /// Keep the raw weighted sum.
    Unclamped,
}

impl ClampPolicy {
    pub fn from_flag(clamp: bool) -> Self {
        if clamp {
            ClampPolicy::Clamp
        } else {
            ClampPolicy::Unclamped
        }
    }
}

impl fmt::Display for ClampPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClampPolicy::Clamp => write!(f, "clamped to 0-100"),
            ClampPolicy::Unclamped => write!(f, "unclamped"),
        }
    }
}

/// Component scores and the weighted result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub income: f64,
    pub growth: f64,
    pub permits: f64,
    pub traffic: f64,
    /// Weighted sum before any clamp.
    pub raw: f64,
    /// Score after applying the clamp policy.
    pub final_score: f64,
}

impl ScoreBreakdown {
    /// Integer score shown on the probability bar.
    pub fn displayed(&self) -> i64 {
        self.final_score.round() as i64
    }
}

/// Compute the site score. Pure and deterministic.
pub fn calculate_prediction(
    market: &MarketData,
    traffic: &FootTrafficReading,
    policy: ClampPolicy,
) -> ScoreBreakdown {
    let income = (market.median_income / 1000.0 * 1.2).min(100.0);
    let growth = market.employment_growth * 20.0;
    let permits = (f64::from(market.new_business_permits) / 15.0).min(100.0);
    let traffic = f64::from(traffic.weekly_visits);

    let raw = income * INCOME_WEIGHT
        + growth * GROWTH_WEIGHT
        + permits * PERMIT_WEIGHT
        + traffic * TRAFFIC_WEIGHT;

    let final_score = match policy {
        ClampPolicy::Clamp => raw.clamp(0.0, 100.0),
        ClampPolicy::Unclamped => raw,
    };

    ScoreBreakdown {
        income,
        growth,
        permits,
        traffic,
        raw,
        final_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locations;
    use crate::models::{LocationId, Trend};

    fn traffic(weekly_visits: u32) -> FootTrafficReading {
        FootTrafficReading {
            weekly_visits,
            trend: Trend::Increasing,
            peak_hours: String::new(),
        }
    }

    #[test]
    fn test_austin_scenario() {
        let market = locations::lookup(LocationId::Austin).market;
        let score = calculate_prediction(&market, &traffic(78), ClampPolicy::Clamp);

        assert!((score.income - 91.0236).abs() < 1e-4);
        assert!((score.growth - 64.0).abs() < 1e-9);
        assert!((score.permits - 56.4667).abs() < 1e-4);
        assert_eq!(score.traffic, 78.0);
        assert!((score.final_score - 71.67).abs() < 0.01);
        assert_eq!(score.displayed(), 72);
    }

    #[test]
    fn test_deterministic() {
        let market = locations::lookup(LocationId::Phoenix).market;
        let first = calculate_prediction(&market, &traffic(40), ClampPolicy::Clamp);
        for _ in 0..10 {
            assert_eq!(
                calculate_prediction(&market, &traffic(40), ClampPolicy::Clamp),
                first
            );
        }
    }

    #[test]
    fn test_component_caps() {
        let market = MarketData {
            population: 1,
            median_income: 500_000.0,
            employment_growth: 0.0,
            new_business_permits: 10_000,
        };
        let score = calculate_prediction(&market, &traffic(0), ClampPolicy::Clamp);
        assert_eq!(score.income, 100.0);
        assert_eq!(score.permits, 100.0);
        assert_eq!(score.final_score, 50.0);
    }

    #[test]
    fn test_high_growth_exceeds_100_only_when_unclamped() {
        let market = MarketData {
            population: 1,
            median_income: 200_000.0,
            employment_growth: 10.0,
            new_business_permits: 3_000,
        };

        let raw = calculate_prediction(&market, &traffic(100), ClampPolicy::Unclamped);
        assert!((raw.final_score - 130.0).abs() < 1e-9);
        assert_eq!(raw.displayed(), 130);

        let clamped = calculate_prediction(&market, &traffic(100), ClampPolicy::Clamp);
        assert_eq!(clamped.final_score, 100.0);
        assert!((clamped.raw - 130.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_growth_clamped_at_zero() {
        let market = MarketData {
            population: 1,
            median_income: 0.0,
            employment_growth: -20.0,
            new_business_permits: 0,
        };
        let score = calculate_prediction(&market, &traffic(0), ClampPolicy::Clamp);
        assert!(score.raw < 0.0);
        assert_eq!(score.final_score, 0.0);
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(ClampPolicy::from_flag(true), ClampPolicy::Clamp);
        assert_eq!(ClampPolicy::from_flag(false), ClampPolicy::Unclamped);
        assert_eq!(ClampPolicy::default(), ClampPolicy::Clamp);
    }
}
