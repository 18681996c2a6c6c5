//! Markdown and JSON report generation.
//!
//! This module renders a scoring run: per-location data streams, source
//! status, score breakdown, probability bar and timeline.

use crate::dashboard::{DisplaySlot, StageState};
use crate::models::{LocationReport, Report, ReportMetadata};
use crate::scoring::calculator::{GROWTH_WEIGHT, INCOME_WEIGHT, PERMIT_WEIGHT, TRAFFIC_WEIGHT};
use crate::scoring::ScoreBreakdown;
use anyhow::Result;

/// Width of the text probability bar in characters.
const BAR_WIDTH: usize = 20;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Bedstone Site Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(report));

    for location in &report.locations {
        output.push_str(&generate_location_section(location));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model:** `{}`\n", metadata.model));
    section.push_str(&format!(
        "- **Percentile Threshold:** {}th percentile\n",
        metadata.percentile
    ));
    section.push_str(&format!("- **Final Score:** {}\n", metadata.clamp_policy));
    if metadata.offline {
        section.push_str("- **Mode:** offline (fallback data only)\n");
    }
    section.push_str(&format!("- **Duration:** {:.1}s\n", metadata.duration_seconds));
    section.push('\n');

    section
}

/// Generate the summary table across locations.
fn generate_summary_section(report: &Report) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Location | Score | Displayed | Timeline | Live Sources |\n");
    section.push_str("|:---|:---:|:---:|:---|:---:|\n");

    for location in &report.locations {
        section.push_str(&format!(
            "| {} | {:.2} | **{}** | {} | {}/5 |\n",
            location.location.name,
            location.score.final_score,
            location.dashboard.probability.label,
            timeline_glyphs(&location.dashboard.timeline),
            location.readings.live_count()
        ));
    }
    section.push('\n');

    section
}

/// Generate the section for a single location.
fn generate_location_section(report: &LocationReport) -> String {
    let mut section = String::new();
    let location = &report.location;
    let dashboard = &report.dashboard;

    section.push_str(&format!("## {}\n\n", location.name));
    section.push_str(&format!(
        "*Coordinates: {} | Population: {} | Median income: ${:.0}*\n\n",
        location.coords, location.market.population, location.market.median_income
    ));

    // Probability bar
    section.push_str(&format!(
        "**Investment probability:** `{}` {} ({})\n\n",
        render_bar(dashboard.probability.width_percent),
        dashboard.probability.label,
        dashboard.percentile_label
    ));
    if !dashboard.applied_models.is_empty() {
        section.push_str(&format!(
            "*Adjusted by model: {}*\n\n",
            dashboard.applied_models.join(", ")
        ));
    }

    // Data streams
    section.push_str("### Data Streams\n\n");
    section.push_str("| Stream | Value | Detail |\n");
    section.push_str("|:---|:---|:---|\n");
    for slot in DisplaySlot::ALL {
        let pair = dashboard.slot(slot);
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            slot.title(),
            pair.primary,
            pair.secondary
        ));
    }
    section.push('\n');

    // Source status
    section.push_str("### Sources\n\n");
    section.push_str("| Source | Status | Detail |\n");
    section.push_str("|:---|:---:|:---|\n");
    for (kind, reason) in report.readings.statuses() {
        match reason {
            None => section.push_str(&format!("| {} | live | |\n", kind)),
            Some(reason) => section.push_str(&format!("| {} | fallback | {} |\n", kind, reason)),
        }
    }
    let permits = report.readings.permits.reading();
    let census = report.readings.census.reading();
    section.push_str(&format!(
        "\n*Permits via {}. Census tract {}, block group {}.*\n\n",
        permits.strategy, census.tract, census.block_group
    ));

    section.push_str(&generate_score_table(&report.score));

    // Timeline
    section.push_str("### Timeline\n\n");
    for (index, stage) in dashboard.timeline.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", index + 1, stage));
    }
    section.push('\n');

    section
}

/// Generate the score breakdown table.
fn generate_score_table(score: &ScoreBreakdown) -> String {
    let mut table = String::new();

    table.push_str("### Score Breakdown\n\n");
    table.push_str("| Component | Score | Weight | Contribution |\n");
    table.push_str("|:---|---:|---:|---:|\n");

    let rows = [
        ("Income", score.income, INCOME_WEIGHT),
        ("Employment growth", score.growth, GROWTH_WEIGHT),
        ("Business permits", score.permits, PERMIT_WEIGHT),
        ("Foot traffic", score.traffic, TRAFFIC_WEIGHT),
    ];
    for (name, value, weight) in rows {
        table.push_str(&format!(
            "| {} | {:.2} | {:.2} | {:.2} |\n",
            name,
            value,
            weight,
            value * weight
        ));
    }
    table.push_str(&format!("| **Total** | | | **{:.2}** |\n\n", score.final_score));
    if (score.raw - score.final_score).abs() > f64::EPSILON {
        table.push_str(&format!("*Raw weighted sum {:.2} was clamped.*\n\n", score.raw));
    }

    table
}

/// Text fill bar for a 0-100 width.
fn render_bar(width_percent: u8) -> String {
    let filled = (usize::from(width_percent.min(100)) * BAR_WIDTH + 50) / 100;
    format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn timeline_glyphs(stages: &[StageState]) -> String {
    stages
        .iter()
        .map(|stage| match stage {
            StageState::Inactive => "○",
            StageState::Active => "●",
            StageState::Current => "◉",
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(
        "*Scores are indicative only. Fallback readings are fixed estimates used when a source is unavailable.*\n",
    );

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
