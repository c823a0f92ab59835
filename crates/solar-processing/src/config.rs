//! Configuration types for loading, profiling and cleaning.
//!
//! Column groups and known countries live in [`SolarSchema`] instead of being
//! embedded in the pipeline, so the core can be exercised with synthetic
//! schemas. Runtime knobs live in [`PipelineConfig`], built with the builder
//! pattern.

use crate::error::SolarError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable overriding the raw data directory.
pub const DATA_DIR_ENV: &str = "SOLAR_DATA_DIR";
/// Environment variable overriding the cleaned output directory.
pub const OUTPUT_DIR_ENV: &str = "SOLAR_OUTPUT_DIR";
/// Environment variable overriding the reports directory.
pub const REPORTS_DIR_ENV: &str = "SOLAR_REPORTS_DIR";

/// Strategy for handling missing values after high-missing columns are dropped.
///
/// This is a closed set: parsing any other name fails with
/// [`SolarError::UnsupportedStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingValueStrategy {
    /// Fill numeric columns with their own median
    #[default]
    Median,
    /// Fill numeric columns with their own mean
    Mean,
    /// Propagate the last valid value forward across all columns
    ForwardFill,
    /// Drop every row containing a missing value
    Drop,
}

impl MissingValueStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Mean => "mean",
            Self::ForwardFill => "forward_fill",
            Self::Drop => "drop",
        }
    }
}

impl fmt::Display for MissingValueStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissingValueStrategy {
    type Err = SolarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "median" => Ok(Self::Median),
            "mean" => Ok(Self::Mean),
            "forward_fill" | "ffill" => Ok(Self::ForwardFill),
            "drop" => Ok(Self::Drop),
            _ => Err(SolarError::UnsupportedStrategy(s.to_string())),
        }
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// The measurement schema the pipeline operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarSchema {
    /// Canonical name of the time axis after loading.
    pub timestamp_column: String,

    /// Irradiance columns (W/m²) that must never be negative.
    pub irradiance_columns: Vec<String>,

    /// Columns coerced to numeric during cleaning.
    pub numeric_columns: Vec<String>,

    /// Columns checked by Z-score outlier detection and removal.
    pub outlier_columns: Vec<String>,

    /// Maintenance flag column (0/1).
    pub cleaning_flag_column: String,

    /// Label column attached when several countries are combined.
    pub country_column: String,

    /// Countries the comparison layer knows about.
    pub known_countries: Vec<String>,

    /// Metrics summarized by the cross-country comparison.
    pub comparison_metrics: Vec<String>,

    /// Primary irradiance metric used for ranking.
    pub ranking_metric: String,
}

impl Default for SolarSchema {
    fn default() -> Self {
        Self {
            timestamp_column: "Timestamp".to_string(),
            irradiance_columns: owned(&["GHI", "DNI", "DHI", "ModA", "ModB"]),
            numeric_columns: owned(&[
                "GHI",
                "DNI",
                "DHI",
                "ModA",
                "ModB",
                "Tamb",
                "RH",
                "WS",
                "WSgust",
                "WSstdev",
                "WD",
                "WDstdev",
                "BP",
                "Cleaning",
                "Precipitation",
                "TModA",
                "TModB",
            ]),
            outlier_columns: owned(&["GHI", "DNI", "DHI", "ModA", "ModB", "WS", "WSgust"]),
            cleaning_flag_column: "Cleaning".to_string(),
            country_column: "Country".to_string(),
            known_countries: owned(&["Benin", "Sierra Leone", "Togo"]),
            comparison_metrics: owned(&["GHI", "DNI", "DHI"]),
            ranking_metric: "GHI".to_string(),
        }
    }
}

impl SolarSchema {
    /// All columns a complete raw file is expected to carry.
    pub fn required_columns(&self) -> Vec<String> {
        let mut cols = vec![self.timestamp_column.clone()];
        cols.extend(self.numeric_columns.iter().cloned());
        cols
    }
}

/// Configuration for the cleaning pipeline and its file layout.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration.
///
/// # Example
///
/// ```rust,ignore
/// use solar_processing::config::{MissingValueStrategy, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .data_dir("data")
///     .missing_strategy(MissingValueStrategy::Mean)
///     .remove_outliers(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding raw (and, by default, cleaned) data files.
    /// Default: "data"
    pub data_dir: PathBuf,

    /// Directory receiving cleaned `<slug>_clean.csv` files.
    /// Default: "data"
    pub output_dir: PathBuf,

    /// Directory receiving cleaning logs and profile reports.
    /// Default: "reports"
    pub reports_dir: PathBuf,

    /// Strategy used by the canonical pipeline for missing values.
    /// Default: Median
    pub missing_strategy: MissingValueStrategy,

    /// Columns whose missing ratio exceeds this value are dropped (0.0 - 1.0).
    /// Default: 0.5
    pub missing_column_threshold: f64,

    /// Absolute Z-score above which a value counts as an outlier.
    /// Default: 3.0
    pub zscore_threshold: f64,

    /// Whether the canonical pipeline removes Z-score outlier rows.
    /// Default: true
    pub remove_outliers: bool,

    /// Measurement schema.
    pub schema: SolarSchema,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data"),
            reports_dir: PathBuf::from("reports"),
            missing_strategy: MissingValueStrategy::default(),
            missing_column_threshold: 0.5,
            zscore_threshold: 3.0,
            remove_outliers: true,
            schema: SolarSchema::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Build a configuration whose directories honor the `SOLAR_*_DIR`
    /// environment variables, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigValidationError> {
        let mut builder = Self::builder();
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            builder = builder.data_dir(dir);
        }
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            builder = builder.output_dir(dir);
        }
        if let Ok(dir) = std::env::var(REPORTS_DIR_ENV) {
            builder = builder.reports_dir(dir);
        }
        builder.build()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.missing_column_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "missing_column_threshold".to_string(),
                value: self.missing_column_threshold,
            });
        }

        if !(self.zscore_threshold.is_finite() && self.zscore_threshold > 0.0) {
            return Err(ConfigValidationError::InvalidZScoreThreshold(
                self.zscore_threshold,
            ));
        }

        if self.schema.timestamp_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyColumnName("timestamp_column"));
        }

        if self.schema.country_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyColumnName("country_column"));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid Z-score threshold: {0} (must be a positive number)")]
    InvalidZScoreThreshold(f64),

    #[error("Schema field '{0}' must name a column")]
    EmptyColumnName(&'static str),
}

impl From<ConfigValidationError> for SolarError {
    fn from(err: ConfigValidationError) -> Self {
        SolarError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    reports_dir: Option<PathBuf>,
    missing_strategy: Option<MissingValueStrategy>,
    missing_column_threshold: Option<f64>,
    zscore_threshold: Option<f64>,
    remove_outliers: Option<bool>,
    schema: Option<SolarSchema>,
}

impl PipelineConfigBuilder {
    /// Set the raw data directory.
    ///
    /// The cleaned output directory follows it unless set explicitly.
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Set the directory for cleaned `<slug>_clean.csv` files.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the directory for cleaning logs and profile reports.
    pub fn reports_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.reports_dir = Some(path.into());
        self
    }

    /// Set the missing-value strategy of the canonical pipeline.
    pub fn missing_strategy(mut self, strategy: MissingValueStrategy) -> Self {
        self.missing_strategy = Some(strategy);
        self
    }

    /// Set the threshold for dropping columns with missing values.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.5 = 50%)
    pub fn missing_column_threshold(mut self, threshold: f64) -> Self {
        self.missing_column_threshold = Some(threshold);
        self
    }

    /// Set the absolute Z-score threshold for outliers.
    pub fn zscore_threshold(mut self, threshold: f64) -> Self {
        self.zscore_threshold = Some(threshold);
        self
    }

    /// Enable or disable Z-score outlier removal in the canonical pipeline.
    pub fn remove_outliers(mut self, remove: bool) -> Self {
        self.remove_outliers = Some(remove);
        self
    }

    /// Replace the measurement schema.
    pub fn schema(mut self, schema: SolarSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let data_dir = self.data_dir.unwrap_or_else(|| PathBuf::from("data"));
        let config = PipelineConfig {
            output_dir: self.output_dir.unwrap_or_else(|| data_dir.clone()),
            data_dir,
            reports_dir: self.reports_dir.unwrap_or_else(|| PathBuf::from("reports")),
            missing_strategy: self.missing_strategy.unwrap_or_default(),
            missing_column_threshold: self.missing_column_threshold.unwrap_or(0.5),
            zscore_threshold: self.zscore_threshold.unwrap_or(3.0),
            remove_outliers: self.remove_outliers.unwrap_or(true),
            schema: self.schema.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.missing_column_threshold, 0.5);
        assert_eq!(config.zscore_threshold, 3.0);
        assert_eq!(config.missing_strategy, MissingValueStrategy::Median);
        assert!(config.remove_outliers);
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_builder_output_dir_follows_data_dir() {
        let config = PipelineConfig::builder().data_dir("raw").build().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("raw"));

        let config = PipelineConfig::builder()
            .data_dir("raw")
            .output_dir("clean")
            .build()
            .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("clean"));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .missing_column_threshold(0.3)
            .zscore_threshold(2.5)
            .missing_strategy(MissingValueStrategy::Drop)
            .remove_outliers(false)
            .build()
            .unwrap();

        assert_eq!(config.missing_column_threshold, 0.3);
        assert_eq!(config.zscore_threshold, 2.5);
        assert_eq!(config.missing_strategy, MissingValueStrategy::Drop);
        assert!(!config.remove_outliers);
    }

    #[test]
    fn test_validation_invalid_column_threshold() {
        let result = PipelineConfig::builder()
            .missing_column_threshold(1.5)
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_invalid_zscore_threshold() {
        let result = PipelineConfig::builder().zscore_threshold(0.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidZScoreThreshold(_)
        ));
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "median".parse::<MissingValueStrategy>().unwrap(),
            MissingValueStrategy::Median
        );
        assert_eq!(
            " Forward_Fill ".parse::<MissingValueStrategy>().unwrap(),
            MissingValueStrategy::ForwardFill
        );
        assert_eq!(
            "drop".parse::<MissingValueStrategy>().unwrap(),
            MissingValueStrategy::Drop
        );
    }

    #[test]
    fn test_strategy_from_str_rejects_unknown() {
        let err = "interpolate".parse::<MissingValueStrategy>().unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_STRATEGY");
    }

    #[test]
    fn test_default_schema_groups() {
        let schema = SolarSchema::default();
        assert!(schema.irradiance_columns.iter().any(|c| c == "ModB"));
        assert!(!schema.irradiance_columns.iter().any(|c| c == "Tamb"));
        assert_eq!(schema.required_columns().len(), 18);
        assert_eq!(schema.required_columns()[0], "Timestamp");
    }

    #[test]
    fn test_config_serialization() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"missing_strategy\":\"median\""));
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.schema, deserialized.schema);
        assert_eq!(config.missing_strategy, deserialized.missing_strategy);
    }
}
