//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::LocationId;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bedstone - geospatial site scoring from open data
///
/// Pulls construction activity, building permits, census geography,
/// amenity density and weather for a site, then scores it 0-100.
///
/// Examples:
///   bedstone --location austin
///   bedstone --location miami,denver --model transformer
///   bedstone --all --format json --output scores.json
///   bedstone --location phoenix --offline
///   bedstone --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Locations to score (comma-separated)
    #[arg(
        short,
        long,
        value_name = "ID",
        value_delimiter = ',',
        default_value = "austin",
        ignore_case = true
    )]
    pub location: Vec<LocationId>,

    /// Score every supported location
    #[arg(long)]
    pub all: bool,

    /// Model adjustment for the displayed score
    ///
    /// transformer (+5), s4 (-3), lstm (baseline). Unknown tags leave the score unchanged.
    /// Can also be set via BEDSTONE_MODEL env var or .bedstone.toml config.
    #[arg(short, long, value_name = "TAG", env = "BEDSTONE_MODEL")]
    pub model: Option<String>,

    /// Percentile threshold shown with the score (1-99)
    #[arg(short, long, value_name = "N")]
    pub percentile: Option<u8>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .bedstone.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Report the raw weighted score without bounding it to 0-100
    #[arg(long)]
    pub unclamped: bool,

    /// Skip all network lookups and use fallback readings
    #[arg(long)]
    pub offline: bool,

    /// Simulated model run: print a random probability without fetching data
    #[arg(long)]
    pub simulate: bool,

    /// Generate a default .bedstone.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(percentile) = self.percentile {
            if !(1..=99).contains(&percentile) {
                return Err("Percentile must be between 1 and 99".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref model) = self.model {
            if model.trim().is_empty() {
                return Err("Model tag cannot be empty".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Locations to score, deduplicated in the order given.
    pub fn selected_locations(&self) -> Vec<LocationId> {
        if self.all {
            return LocationId::ALL.to_vec();
        }

        let mut selected = Vec::new();
        for id in &self.location {
            if !selected.contains(id) {
                selected.push(*id);
            }
        }
        selected
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
