//! Dashboard state for one location.
//!
//! The dashboard is an explicit value handed to the update functions by
//! reference. Source readings land in named slots, and the score drives the
//! probability bar and the four-stage timeline.

use crate::models::Location;
use crate::scoring::{calculate_prediction, ClampPolicy, ModelKind, ScoreBreakdown};
use crate::sources::{FetchedReadings, SourceClient};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Placeholder shown while sources are being fetched.
pub const LOADING: &str = "Loading...";

/// Number of stages on the timeline.
pub const TIMELINE_STAGES: usize = 4;

/// Score above which stages 0-2 are active.
pub const ACTIVE_THRESHOLD: f64 = 70.0;

/// Score above which the last stage is current.
pub const CURRENT_THRESHOLD: f64 = 80.0;

/// Named display slots for the data streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplaySlot {
    Satellite,
    Permits,
    FootTraffic,
    Utility,
}

impl DisplaySlot {
    pub const ALL: [DisplaySlot; 4] = [
        DisplaySlot::Satellite,
        DisplaySlot::Permits,
        DisplaySlot::FootTraffic,
        DisplaySlot::Utility,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            DisplaySlot::Satellite => "Satellite Change Detection",
            DisplaySlot::Permits => "Building Permits",
            DisplaySlot::FootTraffic => "Foot Traffic",
            DisplaySlot::Utility => "Utility Demand",
        }
    }
}

/// Primary and secondary text of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricPair {
    pub primary: String,
    pub secondary: String,
}

impl MetricPair {
    fn loading() -> Self {
        Self {
            primary: LOADING.to_string(),
            secondary: LOADING.to_string(),
        }
    }

    fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }
}

/// State of one timeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    Inactive,
    Active,
    Current,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageState::Inactive => write!(f, "inactive"),
            StageState::Active => write!(f, "active"),
            StageState::Current => write!(f, "current"),
        }
    }
}

/// Stage states for a score: stages 0-2 active above 70, stage 3 current above 80.
pub fn timeline_for(score: f64) -> [StageState; TIMELINE_STAGES] {
    let mut stages = [StageState::Inactive; TIMELINE_STAGES];

    for (index, stage) in stages.iter_mut().enumerate() {
        if score > ACTIVE_THRESHOLD && index <= 2 {
            *stage = StageState::Active;
        }
        if score > CURRENT_THRESHOLD && index == 3 {
            *stage = StageState::Current;
        }
    }

    stages
}

/// The probability fill bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbabilityBar {
    /// Displayed integer score.
    pub score: i64,
    /// Fill width in percent.
    pub width_percent: u8,
    pub label: String,
}

impl ProbabilityBar {
    fn empty() -> Self {
        Self::showing(0)
    }

    fn showing(score: i64) -> Self {
        Self {
            score,
            width_percent: score.clamp(0, 100) as u8,
            label: format!("{}%", score),
        }
    }
}

/// Everything shown for one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub slots: BTreeMap<DisplaySlot, MetricPair>,
    pub probability: ProbabilityBar,
    pub timeline: [StageState; TIMELINE_STAGES],
    pub percentile: u8,
    pub percentile_label: String,
    /// Model adjustments applied since the last score update.
    pub applied_models: Vec<String>,
}

impl Dashboard {
    pub fn new(percentile: u8) -> Self {
        Self {
            slots: DisplaySlot::ALL
                .into_iter()
                .map(|slot| (slot, MetricPair::loading()))
                .collect(),
            probability: ProbabilityBar::empty(),
            timeline: [StageState::Inactive; TIMELINE_STAGES],
            percentile,
            percentile_label: percentile_label(percentile),
            applied_models: Vec::new(),
        }
    }

    pub fn slot(&self, slot: DisplaySlot) -> &MetricPair {
        &self.slots[&slot]
    }

    /// Reset every slot to the loading placeholder.
    pub fn begin_loading(&mut self) {
        for pair in self.slots.values_mut() {
            *pair = MetricPair::loading();
        }
    }

    /// Whether any slot still shows the loading placeholder.
    pub fn is_loading(&self) -> bool {
        self.slots
            .values()
            .any(|pair| pair.primary == LOADING || pair.secondary == LOADING)
    }

    /// Fill the data-stream slots from the fetched readings.
    pub fn apply_readings(&mut self, readings: &FetchedReadings) {
        let satellite = readings.satellite.reading();
        let permits = readings.permits.reading();
        let traffic = readings.foot_traffic.reading();
        let weather = readings.weather.reading();

        let change = if satellite.change_detected {
            format!("Yes ({} sites)", satellite.construction_sites)
        } else {
            "No change detected".to_string()
        };

        self.slots.insert(
            DisplaySlot::Satellite,
            MetricPair::new(change, satellite.last_update.to_string()),
        );
        self.slots.insert(
            DisplaySlot::Permits,
            MetricPair::new(
                format!("{} permits", permits.count),
                permits.trend.to_string(),
            ),
        );
        self.slots.insert(
            DisplaySlot::FootTraffic,
            MetricPair::new(
                format!("{}K", traffic.weekly_visits),
                traffic.trend.to_string(),
            ),
        );
        self.slots.insert(
            DisplaySlot::Utility,
            MetricPair::new(
                format!("Utility Demand Pressure Index: {}", weather.temperature),
                if weather.precipitation > 0.0 {
                    "Active"
                } else {
                    "Normal"
                },
            ),
        );
    }

    /// Show a score on the bar and timeline. Clears previous model adjustments.
    pub fn apply_score(&mut self, score: &ScoreBreakdown) {
        self.probability = ProbabilityBar::showing(score.displayed());
        self.timeline = timeline_for(score.final_score);
        self.applied_models.clear();
    }

    /// Adjust the displayed score for a model selection. Baseline models are not recorded.
    pub fn apply_model(&mut self, model: &ModelKind) {
        if model.is_baseline() {
            debug!("Model {} leaves the score unchanged", model);
            return;
        }

        let adjusted = model.adjust(self.probability.score);
        debug!(
            "Model {} adjusts {} -> {}",
            model, self.probability.score, adjusted
        );
        self.probability = ProbabilityBar::showing(adjusted);
        self.applied_models.push(model.to_string());
    }

    /// Simulated model run: a random probability in [75, 95) with no data fetch.
    pub fn simulate_run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> i64 {
        let probability = rng.gen_range(75..95);
        self.probability = ProbabilityBar::showing(probability);
        probability
    }
}

fn percentile_label(percentile: u8) -> String {
    format!("{}th percentile", percentile)
}

/// Fetch every source for `location`, fill the dashboard and score it.
pub async fn update_location_data(
    client: &SourceClient,
    location: &Location,
    dashboard: &mut Dashboard,
    policy: ClampPolicy,
) -> (FetchedReadings, ScoreBreakdown) {
    dashboard.begin_loading();

    let readings = client.fetch_all(location).await;
    info!(
        "Fetched data for {} ({} live, {} fallback)",
        location.name,
        readings.live_count(),
        readings.fallback_count()
    );
    debug!("Readings for {}: {:?}", location.id, readings);

    dashboard.apply_readings(&readings);

    let score = calculate_prediction(&location.market, readings.foot_traffic.reading(), policy);
    dashboard.apply_score(&score);

    (readings, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locations;
    use crate::models::{LocationId, PermitStrategyKind, SourceOutcome};
    use crate::sources::test_support::*;
    use crate::sources::{census, foot_traffic, permits, satellite, weather};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fallback_readings() -> FetchedReadings {
        FetchedReadings {
            satellite: SourceOutcome::fallback(satellite::fallback_reading(), "test"),
            permits: SourceOutcome::fallback(
                permits::fallback_reading(PermitStrategyKind::LiveQuery),
                "test",
            ),
            census: SourceOutcome::fallback(census::fallback_reading(), "test"),
            foot_traffic: SourceOutcome::fallback(foot_traffic::fallback_reading(), "test"),
            weather: SourceOutcome::fallback(weather::fallback_reading(), "test"),
        }
    }

    #[test]
    fn test_new_dashboard_is_loading() {
        let dashboard = Dashboard::new(90);
        assert!(dashboard.is_loading());
        assert_eq!(dashboard.percentile_label, "90th percentile");
        assert_eq!(dashboard.probability.label, "0%");
    }

    #[test]
    fn test_apply_readings_fills_named_slots() {
        let mut dashboard = Dashboard::new(90);
        dashboard.apply_readings(&fallback_readings());

        assert!(!dashboard.is_loading());
        assert_eq!(
            dashboard.slot(DisplaySlot::Satellite).primary,
            "Yes (2 sites)"
        );
        assert_eq!(dashboard.slot(DisplaySlot::Permits).primary, "42 permits");
        assert_eq!(dashboard.slot(DisplaySlot::Permits).secondary, "stable");
        assert_eq!(dashboard.slot(DisplaySlot::FootTraffic).primary, "78K");
        assert_eq!(
            dashboard.slot(DisplaySlot::FootTraffic).secondary,
            "increasing"
        );
        assert_eq!(
            dashboard.slot(DisplaySlot::Utility).primary,
            "Utility Demand Pressure Index: 72"
        );
        assert_eq!(dashboard.slot(DisplaySlot::Utility).secondary, "Normal");
    }

    #[test]
    fn test_no_change_and_precipitation() {
        let mut readings = fallback_readings();
        let mut quiet = satellite::fallback_reading();
        quiet.change_detected = false;
        readings.satellite = SourceOutcome::live(quiet);
        let mut wet = weather::fallback_reading();
        wet.precipitation = 0.4;
        readings.weather = SourceOutcome::live(wet);

        let mut dashboard = Dashboard::new(90);
        dashboard.apply_readings(&readings);
        assert_eq!(
            dashboard.slot(DisplaySlot::Satellite).primary,
            "No change detected"
        );
        assert_eq!(dashboard.slot(DisplaySlot::Utility).secondary, "Active");
    }

    #[test]
    fn test_timeline_thresholds() {
        use StageState::*;
        assert_eq!(timeline_for(70.0), [Inactive; 4]);
        assert_eq!(timeline_for(70.5), [Active, Active, Active, Inactive]);
        assert_eq!(timeline_for(80.0), [Active, Active, Active, Inactive]);
        assert_eq!(timeline_for(80.1), [Active, Active, Active, Current]);
    }

    #[test]
    fn test_apply_score_and_model() {
        let market = locations::lookup(LocationId::Austin).market;
        let score = calculate_prediction(
            &market,
            &foot_traffic::fallback_reading(),
            ClampPolicy::Clamp,
        );
        let mut dashboard = Dashboard::new(90);
        dashboard.apply_score(&score);

        assert_eq!(dashboard.probability.label, "72%");
        assert_eq!(dashboard.probability.width_percent, 72);
        assert_eq!(dashboard.timeline[0], StageState::Active);
        assert_eq!(dashboard.timeline[3], StageState::Inactive);

        dashboard.apply_model(&ModelKind::Transformer);
        assert_eq!(dashboard.probability.label, "77%");
        dashboard.apply_model(&ModelKind::S4);
        assert_eq!(dashboard.probability.score, 74);
        assert_eq!(dashboard.applied_models, vec!["transformer", "s4"]);
    }

    #[test]
    fn test_baseline_model_not_recorded() {
        let mut dashboard = Dashboard::new(90);
        dashboard.apply_score(&calculate_prediction(
            &locations::lookup(LocationId::Austin).market,
            &foot_traffic::fallback_reading(),
            ClampPolicy::Clamp,
        ));

        dashboard.apply_model(&ModelKind::Lstm);
        dashboard.apply_model(&ModelKind::from("gru"));
        assert_eq!(dashboard.probability.label, "72%");
        assert!(dashboard.applied_models.is_empty());
    }

    #[test]
    fn test_unclamped_bar_width_bounded() {
        let mut dashboard = Dashboard::new(90);
        dashboard.apply_score(&ScoreBreakdown {
            income: 100.0,
            growth: 200.0,
            permits: 100.0,
            traffic: 100.0,
            raw: 130.0,
            final_score: 130.0,
        });
        assert_eq!(dashboard.probability.label, "130%");
        assert_eq!(dashboard.probability.width_percent, 100);
    }

    #[test]
    fn test_simulate_run_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut dashboard = Dashboard::new(75);
        for _ in 0..100 {
            let p = dashboard.simulate_run(&mut rng);
            assert!((75..95).contains(&p));
            assert_eq!(dashboard.probability.label, format!("{}%", p));
        }
    }

    #[test]
    fn test_percentile_label() {
        let dashboard = Dashboard::new(95);
        assert_eq!(dashboard.percentile_label, "95th percentile");
    }

    #[tokio::test]
    async fn test_every_location_completes_without_loading() {
        let client = client_for(config_for(UNREACHABLE));
        for location in LocationId::ALL.map(locations::lookup) {
            let mut dashboard = Dashboard::new(90);
            let (readings, score) =
                update_location_data(&client, location, &mut dashboard, ClampPolicy::Clamp).await;

            assert!(!dashboard.is_loading(), "{} left loading", location.id);
            assert_eq!(dashboard.probability.score, score.displayed());
            assert!(readings.census.fallback_reason().is_some());
        }
    }

    #[tokio::test]
    async fn test_austin_offline_scores_72() {
        let mut config = config_for(UNREACHABLE);
        config.offline = true;
        let client = client_for(config);
        let mut dashboard = Dashboard::new(90);

        let (_, score) = update_location_data(
            &client,
            locations::lookup(LocationId::Austin),
            &mut dashboard,
            ClampPolicy::Clamp,
        )
        .await;

        assert_eq!(score.displayed(), 72);
        assert_eq!(dashboard.probability.label, "72%");
    }
}
