use serde::{Deserialize, Serialize};

// ============================================================================
// Cleaning log
// ============================================================================

/// One audit record appended by a cleaning step that changed the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningLogEntry {
    pub action: String,
    pub details: String,
}

impl CleaningLogEntry {
    pub fn new(action: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            details: details.into(),
        }
    }
}

/// Stages of the canonical cleaning pipeline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    Created,
    DuplicatesRemoved,
    NumericCoerced,
    MissingHandled,
    IrradianceValidated,
    OutliersRemoved,
    OutliersCapped,
    Finalized,
}

impl CleaningStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::DuplicatesRemoved => "Duplicates Removed",
            Self::NumericCoerced => "Numeric Coerced",
            Self::MissingHandled => "Missing Values Handled",
            Self::IrradianceValidated => "Irradiance Validated",
            Self::OutliersRemoved => "Outliers Removed",
            Self::OutliersCapped => "Outliers Capped",
            Self::Finalized => "Finalized",
        }
    }
}

/// Row retention figures for one cleaning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub country: String,
    pub original_rows: usize,
    pub cleaned_rows: usize,
    pub rows_removed: usize,
    pub retention_percent: f64,
    pub original_columns: usize,
    pub cleaned_columns: usize,
}

impl CleaningSummary {
    pub fn new(
        country: impl Into<String>,
        original_shape: (usize, usize),
        cleaned_shape: (usize, usize),
    ) -> Self {
        let (original_rows, original_columns) = original_shape;
        let (cleaned_rows, cleaned_columns) = cleaned_shape;
        let retention_percent = if original_rows > 0 {
            cleaned_rows as f64 / original_rows as f64 * 100.0
        } else {
            0.0
        };
        Self {
            country: country.into(),
            original_rows,
            cleaned_rows,
            rows_removed: original_rows.saturating_sub(cleaned_rows),
            retention_percent,
            original_columns,
            cleaned_columns,
        }
    }
}

// ============================================================================
// Profiling results
// ============================================================================

/// Descriptive statistics for one numeric column.
///
/// Statistics that are undefined for the available sample size (e.g. std of a
/// single value, skewness below three values) are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
    pub mode: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
    pub variance: Option<f64>,
}

impl ColumnStatistics {
    /// Row labels used when the statistics are laid out as a table.
    pub const STATISTIC_NAMES: [&'static str; 13] = [
        "count", "mean", "std", "min", "25%", "50%", "75%", "max", "median", "mode", "skewness",
        "kurtosis", "variance",
    ];

    /// Values in the same order as [`Self::STATISTIC_NAMES`].
    pub fn values(&self) -> [Option<f64>; 13] {
        [
            Some(self.count as f64),
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.q50,
            self.q75,
            self.max,
            self.median,
            self.mode,
            self.skewness,
            self.kurtosis,
            self.variance,
        ]
    }
}

/// Missing-value figures for a column with at least one missing cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValueEntry {
    pub column: String,
    pub missing_count: usize,
    pub missing_percent: f64,
    pub dtype: String,
}

/// Z-score outliers found in one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScoreOutliers {
    pub column: String,
    pub count: usize,
    /// Percentage of all rows in the table, not of non-missing values.
    pub percentage: f64,
    /// Positions of the flagged rows in the profiled table.
    pub indices: Vec<usize>,
}

/// Tukey-fence outliers found in one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IqrOutliers {
    pub column: String,
    pub count: usize,
    pub percentage: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Aggregate data-quality score, every metric a percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub completeness: f64,
    pub validity: f64,
    pub uniqueness: f64,
    pub overall_quality: f64,
}

impl QualityScore {
    pub const COMPLETENESS_WEIGHT: f64 = 0.4;
    pub const VALIDITY_WEIGHT: f64 = 0.4;
    pub const UNIQUENESS_WEIGHT: f64 = 0.2;

    /// Combine the three sub-scores with the fixed weights.
    pub fn from_components(completeness: f64, validity: f64, uniqueness: f64) -> Self {
        Self {
            completeness,
            validity,
            uniqueness,
            overall_quality: completeness * Self::COMPLETENESS_WEIGHT
                + validity * Self::VALIDITY_WEIGHT
                + uniqueness * Self::UNIQUENESS_WEIGHT,
        }
    }

    /// Metric name / value pairs in reporting order.
    pub fn metrics(&self) -> [(&'static str, f64); 4] {
        [
            ("completeness", self.completeness),
            ("validity", self.validity),
            ("uniqueness", self.uniqueness),
            ("overall_quality", self.overall_quality),
        ]
    }
}

/// Everything the profiler knows about a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileReport {
    pub shape: (usize, usize),
    pub summary_statistics: Vec<ColumnStatistics>,
    pub missing_values: Vec<MissingValueEntry>,
    pub outliers_zscore: Vec<ZScoreOutliers>,
    pub outliers_iqr: Vec<IqrOutliers>,
    /// `None` for an empty table.
    pub quality_score: Option<QualityScore>,
}

// ============================================================================
// Loader metadata
// ============================================================================

/// Basic structural facts about a loaded table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub rows: usize,
    pub columns: usize,
    pub estimated_size_mb: f64,
    /// First and last timestamp, formatted as `%Y-%m-%d %H:%M:%S`.
    pub date_range: Option<(String, String)>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_score_weights() {
        let score = QualityScore::from_components(90.0, 80.0, 100.0);
        assert!((score.overall_quality - 88.0).abs() < 1e-9);
    }

    #[test]
    fn test_quality_score_metric_names() {
        let names: Vec<&str> = QualityScore::from_components(1.0, 1.0, 1.0)
            .metrics()
            .iter()
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(
            names,
            vec!["completeness", "validity", "uniqueness", "overall_quality"]
        );
    }

    #[test]
    fn test_cleaning_summary_retention() {
        let summary = CleaningSummary::new("Benin", (200, 18), (150, 18));
        assert_eq!(summary.rows_removed, 50);
        assert!((summary.retention_percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_cleaning_summary_empty_input() {
        let summary = CleaningSummary::new("Togo", (0, 0), (0, 0));
        assert_eq!(summary.retention_percent, 0.0);
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&CleaningStage::IrradianceValidated).unwrap();
        assert_eq!(json, "\"irradiance_validated\"");
    }
}
