//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.bedstone.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".bedstone.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Request settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Open-data endpoints.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Scoring settings.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Display settings.
    #[serde(default)]
    pub display: DisplayConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// HTTP request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Skip all requests and use fallback readings.
    #[serde(default)]
    pub offline: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            offline: false,
        }
    }
}

fn default_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("bedstone/{}", env!("CARGO_PKG_VERSION"))
}

/// Base URLs of the open-data sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Overpass API interpreter.
    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,

    /// Census geocoder `geographies/coordinates` endpoint.
    #[serde(default = "default_census_url")]
    pub census_url: String,

    /// Open-Meteo forecast endpoint.
    #[serde(default = "default_weather_url")]
    pub weather_url: String,

    /// Austin building permits dataset.
    #[serde(default = "default_austin_permits_url")]
    pub austin_permits_url: String,

    /// Miami-Dade building permits dataset.
    #[serde(default = "default_miami_permits_url")]
    pub miami_permits_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            overpass_url: default_overpass_url(),
            census_url: default_census_url(),
            weather_url: default_weather_url(),
            austin_permits_url: default_austin_permits_url(),
            miami_permits_url: default_miami_permits_url(),
        }
    }
}

fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_census_url() -> String {
    "https://geocoding.geo.census.gov/geocoder/geographies/coordinates".to_string()
}

fn default_weather_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_austin_permits_url() -> String {
    "https://data.austintexas.gov/resource/3syk-w9eu.json".to_string()
}

fn default_miami_permits_url() -> String {
    "https://opendata.miamidade.gov/resource/9s5b-ng2b.json".to_string()
}

/// Score calculation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Bound the final score to [0, 100].
    #[serde(default = "default_true")]
    pub clamp_final_score: bool,

    /// Model adjustment applied to displayed scores.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            clamp_final_score: true,
            model: default_model(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "lstm".to_string()
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Percentile threshold shown alongside the score (1-99).
    #[serde(default = "default_percentile")]
    pub percentile: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            percentile: default_percentile(),
        }
    }
}

fn default_percentile() -> u8 {
    90
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.bedstone.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if !(1..=99).contains(&self.display.percentile) {
            anyhow::bail!(
                "display.percentile must be between 1 and 99, got {}",
                self.display.percentile
            );
        }
        if self.network.timeout_seconds == 0 {
            anyhow::bail!("network.timeout_seconds must be at least 1");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.scoring.model = model.clone();
        }

        if let Some(percentile) = args.percentile {
            self.display.percentile = percentile;
        }

        if let Some(timeout) = args.timeout {
            self.network.timeout_seconds = timeout;
        }

        if let Some(format) = args.format {
            self.general.format = format;
        }

        // Flags always override
        if args.unclamped {
            self.scoring.clamp_final_score = false;
        }
        if args.offline {
            self.network.offline = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.timeout_seconds, 15);
        assert_eq!(config.scoring.model, "lstm");
        assert!(config.scoring.clamp_final_score);
        assert_eq!(config.display.percentile, 90);
        assert!(config.endpoints.overpass_url.contains("overpass-api.de"));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
[general]
format = "json"

[network]
timeout_seconds = 5

[scoring]
clamp_final_score = false
model = "transformer"

[endpoints]
weather_url = "http://localhost:9000/forecast"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.network.timeout_seconds, 5);
        assert!(!config.scoring.clamp_final_score);
        assert_eq!(config.scoring.model, "transformer");
        assert_eq!(
            config.endpoints.weather_url,
            "http://localhost:9000/forecast"
        );
        // Untouched sections keep their defaults
        assert_eq!(config.endpoints.census_url, default_census_url());
        assert_eq!(config.display.percentile, 90);
    }

    #[test]
    fn test_load_rejects_bad_percentile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[display]\npercentile = 100\n").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[display]\npercentile = 75\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.display.percentile, 75);
    }

    #[test]
    fn test_merge_only_explicit_args() {
        let mut config = Config::default();
        config.scoring.model = "s4".to_string();
        config.network.timeout_seconds = 30;

        let mut args = make_args();
        args.percentile = Some(80);
        args.unclamped = true;
        config.merge_with_args(&args);

        assert_eq!(config.scoring.model, "s4");
        assert_eq!(config.network.timeout_seconds, 30);
        assert_eq!(config.display.percentile, 80);
        assert!(!config.scoring.clamp_final_score);
        assert!(!config.network.offline);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[network]"));
        assert!(toml_str.contains("[endpoints]"));
        assert!(toml_str.contains("[scoring]"));

        let round: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(round.display.percentile, 90);
    }
}
