use crate::correlation::CorrelationSpec;
use crate::data::Granularity;
use crate::detection::DetectionConfig;
use crate::features::{PopulationTable, TierConfig};
use crate::pipeline::PipelineConfig;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config/pulse.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub aggregation: AggregationConfig,
    pub detection: DetectionConfig,
    /// "State/District" = estimated population
    pub population: PopulationTable,
    #[serde(default = "CorrelationSpec::defaults")]
    pub correlations: Vec<CorrelationSpec>,
    /// Volume tiers for the digital divide comparison
    pub tiers: TierConfig,
    pub logging: LoggingConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            aggregation: AggregationConfig::default(),
            detection: DetectionConfig::default(),
            population: PopulationTable::new(),
            correlations: CorrelationSpec::defaults(),
            tiers: TierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub granularity: Granularity,
    pub workers: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Month,
            workers: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub output: String,
    /// Empty for stdout
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: "pretty".to_string(),
            file_path: String::new(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AnalysisConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Layered load: defaults, then the file named by `PULSE_CONFIG` (or
    /// config/pulse.toml when present), then `PULSE_*` environment variables
    ///
    /// Nested keys use `__`, e.g. `PULSE_DETECTION__SIGMA_THRESHOLD=2.5`.
    pub fn load() -> Result<Self> {
        let path = std::env::var("PULSE_CONFIG").ok().map(PathBuf::from);
        Self::load_layered(path.as_deref())
    }

    pub fn load_layered(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_PATH).required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("PULSE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AnalysisConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the detectors cannot work with
    pub fn validate(&self) -> Result<()> {
        let detection = &self.detection;

        ensure!(
            detection.baseline_window_periods >= 2,
            "detection.baseline_window_periods must be at least 2, got {}",
            detection.baseline_window_periods
        );
        for (name, value) in [
            ("sigma_threshold", detection.sigma_threshold),
            ("divide_ratio_threshold", detection.divide_ratio_threshold),
            ("narrative_ratio_threshold", detection.narrative_ratio_threshold),
        ] {
            ensure!(
                value.is_finite() && value > 0.0,
                "detection.{} must be a positive number, got {}",
                name,
                value
            );
        }
        ensure!(self.aggregation.workers > 0, "aggregation.workers must be at least 1");
        ensure!(
            self.tiers.high_volume_quantile > 0.0 && self.tiers.high_volume_quantile < 1.0,
            "tiers.high_volume_quantile must be between 0 and 1, got {}",
            self.tiers.high_volume_quantile
        );

        Ok(())
    }

    /// Core pipeline settings
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            granularity: self.aggregation.granularity,
            workers: self.aggregation.workers,
            detection: self.detection.clone(),
            population: self.population.clone(),
            correlations: self.correlations.clone(),
            tiers: self.tiers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{CorrelationAxis, SeriesKind};
    use crate::data::RegionId;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
[aggregation]
granularity = "week"
workers = 4

[detection]
baseline_window_periods = 8
sigma_threshold = 3.0

[population]
"Haryana/Nuh" = 1089263

[[correlations]]
series_a = "biometric_updates"
series_b = "school_age_enrolments"
axis = "region"

[tiers]
min_volume = 50

[logging]
level = "debug"
output = "json"
"#;

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pulse.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(config.aggregation.granularity, Granularity::Week);
        assert_eq!(config.aggregation.workers, 4);
        assert_eq!(config.detection.baseline_window_periods, 8);
        assert_eq!(config.detection.divide_ratio_threshold, 10.0);
        assert_eq!(config.population.get(&RegionId::new("Haryana", "Nuh")), Some(1_089_263));
        assert_eq!(
            config.correlations,
            vec![CorrelationSpec {
                series_a: SeriesKind::BiometricUpdates,
                series_b: SeriesKind::SchoolAgeEnrolments,
                axis: CorrelationAxis::Region,
            }]
        );
        assert_eq!(config.tiers.min_volume, 50);
        assert_eq!(config.tiers.high_volume_quantile, 0.9);
        assert_eq!(config.logging.output, "json");
        assert!(config.logging.file_path.is_empty());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AnalysisConfig = toml::from_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.correlations.len(), 2);
    }

    #[test]
    fn test_layered_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pulse.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = AnalysisConfig::load_layered(Some(&path)).unwrap();
        assert_eq!(config.aggregation.workers, 4);
        assert_eq!(config.detection.sigma_threshold, 3.0);
        assert_eq!(config.population.get(&RegionId::new("haryana", "NUH")), Some(1_089_263));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AnalysisConfig::default();
        config.detection.baseline_window_periods = 1;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.detection.sigma_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.detection.divide_ratio_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.aggregation.workers = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.tiers.high_volume_quantile = 1.0;
        assert!(config.validate().is_err());

        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_pipeline_config() {
        let mut config = AnalysisConfig::default();
        config.aggregation.workers = 3;
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.workers, 3);
        assert_eq!(pipeline.detection, config.detection);
        assert_eq!(pipeline.tiers, config.tiers);
    }
}
