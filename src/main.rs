//! Bedstone - geospatial site scoring from open data
//!
//! A CLI tool that queries public construction, permit, census, amenity and
//! weather sources for a set of locations, scores each one for investment
//! potential and renders a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success (including runs where some sources fell back)
//!   1 - Runtime error (config, output file, HTTP client setup)

mod cli;
mod config;
mod dashboard;
mod geo;
mod locations;
mod models;
mod report;
mod scoring;
mod sources;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use dashboard::Dashboard;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use models::{Location, LocationReport, Report, ReportMetadata};
use scoring::{ClampPolicy, ModelKind};
use sources::{SourceClient, SourceConfig};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so [general] verbose can raise the level
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config)?;

    info!("Bedstone v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_source {
        Some(path) => info!("Loaded config from {}", path),
        None => debug!("No config file found, using defaults"),
    }

    match run(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .bedstone.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize endpoints, timeout, model and percentile.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run the scoring workflow for every selected location.
async fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();
    let model = ModelKind::from(config.scoring.model.as_str());

    // Handle --simulate: random probability, no network
    if args.simulate {
        return handle_simulate(&config, &model);
    }

    let policy = ClampPolicy::from_flag(config.scoring.clamp_final_score);
    let client = SourceClient::new(SourceConfig::from(&config))
        .context("Failed to build HTTP client")?;

    let selected: Vec<&'static Location> = args
        .selected_locations()
        .into_iter()
        .map(locations::lookup)
        .collect();

    eprintln!("🛰️  Scoring {} location(s)...", selected.len());
    eprintln!("   Model: {}", model);
    eprintln!("   Final score: {}", policy);
    if client.config().offline {
        eprintln!("   Offline: every source uses its fallback reading");
    } else {
        eprintln!(
            "   Timeout: {}s per request",
            client.config().timeout_seconds
        );
    }

    let progress = progress_bar(selected.len(), args.quiet)?;

    // Each location gets its own dashboard; pipelines share only the client
    let results = join_all(selected.iter().map(|location| {
        score_location(
            &client,
            location,
            config.display.percentile,
            policy,
            &model,
            progress.as_ref(),
        )
    }))
    .await;

    if let Some(pb) = progress {
        pb.finish_with_message("Scoring complete");
    }

    let report = Report {
        metadata: ReportMetadata {
            generated_at: Utc::now(),
            model: model.to_string(),
            percentile: config.display.percentile,
            clamp_policy: policy,
            offline: config.network.offline,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        locations: results,
    };

    let fallbacks = report.fallback_count();
    if fallbacks > 0 {
        warn!("{} source lookup(s) fell back to fixed readings", fallbacks);
    }

    // Generate and emit the report
    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!("\n✅ Report saved to: {}", path.display());
        }
        None => println!("{}", output),
    }

    // Print summary
    eprintln!("\n📊 Scoring Summary:");
    for location in &report.locations {
        eprintln!(
            "   {} - {} ({} fallback)",
            location.location.name,
            location.dashboard.probability.label,
            location.readings.fallback_count()
        );
    }
    eprintln!("   Duration: {:.1}s", report.metadata.duration_seconds);

    Ok(())
}

/// Fetch, score and adjust one location against its own dashboard.
async fn score_location(
    client: &SourceClient,
    location: &Location,
    percentile: u8,
    policy: ClampPolicy,
    model: &ModelKind,
    progress: Option<&ProgressBar>,
) -> LocationReport {
    let mut dashboard = Dashboard::new(percentile);

    let (readings, score) =
        dashboard::update_location_data(client, location, &mut dashboard, policy).await;
    dashboard.apply_model(model);

    if dashboard.is_loading() {
        warn!("{}: dashboard still has unfilled slots", location.name);
    }

    info!(
        "{}: score {:.2}, displayed {}",
        location.name, score.final_score, dashboard.probability.label
    );

    if let Some(pb) = progress {
        pb.set_message(location.name);
        pb.inc(1);
    }

    LocationReport {
        location: *location,
        readings,
        score,
        dashboard,
    }
}

/// Handle --simulate: print a random probability without fetching data.
fn handle_simulate(config: &Config, model: &ModelKind) -> Result<()> {
    let mut dashboard = Dashboard::new(config.display.percentile);
    let probability = dashboard.simulate_run(&mut rand::thread_rng());

    println!(
        "🎲 Simulated {} run: {}% ({})",
        model, probability, dashboard.percentile_label
    );
    println!("   No data was fetched.");
    Ok(())
}

/// Progress bar over the selected locations, hidden in quiet mode.
fn progress_bar(len: usize, quiet: bool) -> Result<Option<ProgressBar>> {
    if quiet {
        return Ok(None);
    }

    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)?
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(Some(pb))
}

/// Load configuration from file or use defaults.
///
/// Returns the config and the path it came from, if any.
fn load_config(args: &Args) -> Result<(Config, Option<String>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, Some(config_path.display().to_string())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, Some(DEFAULT_CONFIG_FILE.to_string()))),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", DEFAULT_CONFIG_FILE, e);
            Ok((Config::default(), None))
        }
    }
}
