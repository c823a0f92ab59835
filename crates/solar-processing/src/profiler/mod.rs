//! Data profiling module for quality diagnostics.
//!
//! This module provides read-only analysis over a snapshot of a
//! measurement table:
//! - Descriptive statistics per numeric column
//! - Missing-value report
//! - Z-score and IQR outlier detection
//! - Aggregate data-quality score

pub(crate) mod statistics;

use crate::config::SolarSchema;
use crate::error::{Result, SolarError};
use crate::types::{
    ColumnStatistics, IqrOutliers, MissingValueEntry, ProfileReport, QualityScore, ZScoreOutliers,
};
use crate::utils::{self, duplicate_row_count, missing_count};
use polars::prelude::*;
use tracing::{debug, warn};

/// Missing percentage above which a column is reported at `warn` level.
pub const HIGH_MISSING_PERCENT: f64 = 5.0;

/// Default absolute Z-score threshold.
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

/// Data profiler over a private copy of a measurement table.
///
/// Numeric columns are detected once, at construction.
pub struct DataProfiler {
    df: DataFrame,
    schema: SolarSchema,
    numeric_columns: Vec<String>,
}

static_assertions::assert_impl_all!(DataProfiler: Send);

impl DataProfiler {
    /// Profile a copy of `df` with the default solar schema.
    pub fn new(df: &DataFrame) -> Self {
        Self::with_schema(df, SolarSchema::default())
    }

    /// Profile a copy of `df` with a custom schema.
    pub fn with_schema(df: &DataFrame, schema: SolarSchema) -> Self {
        let numeric_columns = utils::numeric_column_names(df);
        debug!(
            rows = df.height(),
            numeric = numeric_columns.len(),
            "Profiler created"
        );
        Self {
            df: df.clone(),
            schema,
            numeric_columns,
        }
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    fn percent_of_rows(&self, count: usize) -> f64 {
        if self.df.height() == 0 {
            0.0
        } else {
            count as f64 / self.df.height() as f64 * 100.0
        }
    }

    // ========================================================================
    // Descriptive statistics
    // ========================================================================

    /// Descriptive statistics for every numeric column, in table order.
    pub fn summary_statistics(&self) -> Result<Vec<ColumnStatistics>> {
        self.numeric_columns
            .iter()
            .map(|name| self.column_statistics(name))
            .collect()
    }

    fn column_statistics(&self, name: &str) -> Result<ColumnStatistics> {
        let values = utils::non_null_f64(&self.df, name)?;
        let sorted = statistics::sorted(&values);

        Ok(ColumnStatistics {
            column: name.to_string(),
            count: values.len(),
            mean: statistics::mean(&values),
            std: statistics::sample_std(&values),
            min: sorted.first().copied(),
            q25: statistics::quantile_sorted(&sorted, 0.25),
            q50: statistics::quantile_sorted(&sorted, 0.5),
            q75: statistics::quantile_sorted(&sorted, 0.75),
            max: sorted.last().copied(),
            median: statistics::quantile_sorted(&sorted, 0.5),
            mode: statistics::mode_sorted(&sorted),
            skewness: statistics::skewness(&values),
            kurtosis: statistics::kurtosis(&values),
            variance: statistics::sample_variance(&values),
        })
    }

    /// Summary statistics laid out as a table: one `statistic` label column,
    /// then one column per numeric column.
    pub fn summary_statistics_frame(&self) -> Result<DataFrame> {
        let stats = self.summary_statistics()?;
        let labels: Vec<&str> = ColumnStatistics::STATISTIC_NAMES.to_vec();

        let mut columns = vec![Column::from(Series::new("statistic".into(), labels))];
        for stat in &stats {
            let values: Vec<Option<f64>> = stat.values().to_vec();
            columns.push(Column::from(Series::new(stat.column.as_str().into(), values)));
        }

        Ok(DataFrame::new(columns)?)
    }

    // ========================================================================
    // Missing values
    // ========================================================================

    /// Columns with at least one missing value, most incomplete first.
    pub fn missing_value_report(&self) -> Result<Vec<MissingValueEntry>> {
        let mut report = Vec::new();

        for col in self.df.get_columns() {
            let series = col.as_materialized_series();
            let count = missing_count(series)?;
            if count == 0 {
                continue;
            }
            report.push(MissingValueEntry {
                column: col.name().to_string(),
                missing_count: count,
                missing_percent: self.percent_of_rows(count),
                dtype: series.dtype().to_string(),
            });
        }

        report.sort_by(|a, b| b.missing_percent.total_cmp(&a.missing_percent));

        for entry in report
            .iter()
            .filter(|e| e.missing_percent > HIGH_MISSING_PERCENT)
        {
            warn!(
                column = %entry.column,
                percent = entry.missing_percent,
                "High share of missing values"
            );
        }

        Ok(report)
    }

    /// Missing-value report as a table with columns
    /// `column, missing_count, missing_percent, dtype`.
    pub fn missing_values_frame(&self) -> Result<DataFrame> {
        let report = self.missing_value_report()?;
        Ok(df![
            "column" => report.iter().map(|e| e.column.as_str()).collect::<Vec<_>>(),
            "missing_count" => report.iter().map(|e| e.missing_count as u64).collect::<Vec<_>>(),
            "missing_percent" => report.iter().map(|e| e.missing_percent).collect::<Vec<_>>(),
            "dtype" => report.iter().map(|e| e.dtype.as_str()).collect::<Vec<_>>(),
        ]?)
    }

    // ========================================================================
    // Outliers
    // ========================================================================

    fn default_zscore_columns(&self) -> Vec<String> {
        self.schema
            .outlier_columns
            .iter()
            .filter(|c| self.numeric_columns.contains(c))
            .cloned()
            .collect()
    }

    /// Z-score outliers per column.
    ///
    /// `columns` defaults to the schema's outlier columns that are numeric.
    /// Requested columns missing from the table are skipped.
    pub fn detect_outliers_zscore(
        &self,
        columns: Option<&[String]>,
        threshold: f64,
    ) -> Result<Vec<ZScoreOutliers>> {
        let columns = columns
            .map(<[String]>::to_vec)
            .unwrap_or_else(|| self.default_zscore_columns());
        let mut found = Vec::new();

        for name in columns {
            if !utils::has_column(&self.df, &name) {
                debug!(column = %name, "Skipping absent column");
                continue;
            }

            let scores = statistics::abs_zscores(&utils::column_f64(&self.df, &name)?);
            let indices: Vec<usize> = scores
                .iter()
                .enumerate()
                .filter(|(_, z)| z.is_some_and(|z| z > threshold))
                .map(|(i, _)| i)
                .collect();

            if !indices.is_empty() {
                found.push(ZScoreOutliers {
                    column: name,
                    count: indices.len(),
                    percentage: self.percent_of_rows(indices.len()),
                    indices,
                });
            }
        }

        Ok(found)
    }

    /// Tukey-fence outliers per column. `columns` defaults to every numeric column.
    pub fn detect_outliers_iqr(&self, columns: Option<&[String]>) -> Result<Vec<IqrOutliers>> {
        let columns = columns
            .map(<[String]>::to_vec)
            .unwrap_or_else(|| self.numeric_columns.clone());
        let mut found = Vec::new();

        for name in columns {
            if !utils::has_column(&self.df, &name) {
                debug!(column = %name, "Skipping absent column");
                continue;
            }

            let values = utils::non_null_f64(&self.df, &name)?;
            let Some((lower_bound, upper_bound)) = statistics::iqr_bounds(&values) else {
                continue;
            };
            let count = values
                .iter()
                .filter(|v| **v < lower_bound || **v > upper_bound)
                .count();

            if count > 0 {
                found.push(IqrOutliers {
                    column: name,
                    count,
                    percentage: self.percent_of_rows(count),
                    lower_bound,
                    upper_bound,
                });
            }
        }

        Ok(found)
    }

    // ========================================================================
    // Quality score
    // ========================================================================

    /// Completeness, validity and uniqueness, combined into an overall score.
    ///
    /// # Errors
    /// [`SolarError::EmptyTable`] when the table has no rows.
    pub fn data_quality_score(&self) -> Result<QualityScore> {
        let rows = self.df.height();
        if rows == 0 {
            return Err(SolarError::EmptyTable("data quality score"));
        }

        let total_cells = rows * self.df.width();
        let mut missing_cells = 0;
        for col in self.df.get_columns() {
            missing_cells += missing_count(col.as_materialized_series())?;
        }
        let completeness = if total_cells == 0 {
            100.0
        } else {
            (total_cells - missing_cells) as f64 / total_cells as f64 * 100.0
        };

        let mut negative_readings = 0;
        for name in &self.schema.irradiance_columns {
            if utils::has_column(&self.df, name) {
                negative_readings += utils::non_null_f64(&self.df, name)?
                    .iter()
                    .filter(|v| **v < 0.0)
                    .count();
            }
        }
        let validity = (100.0 - negative_readings as f64 / rows as f64 * 100.0).max(0.0);

        let duplicates = duplicate_row_count(&self.df)?;
        let uniqueness = (rows - duplicates) as f64 / rows as f64 * 100.0;

        Ok(QualityScore::from_components(
            completeness,
            validity,
            uniqueness,
        ))
    }

    /// Bundle every profiler output into one serializable report.
    pub fn generate_profile_report(&self) -> Result<ProfileReport> {
        let quality_score = match self.data_quality_score() {
            Ok(score) => Some(score),
            Err(SolarError::EmptyTable(_)) => None,
            Err(e) => return Err(e),
        };

        Ok(ProfileReport {
            shape: self.df.shape(),
            summary_statistics: self.summary_statistics()?,
            missing_values: self.missing_value_report()?,
            outliers_zscore: self.detect_outliers_zscore(None, DEFAULT_ZSCORE_THRESHOLD)?,
            outliers_iqr: self.detect_outliers_iqr(None)?,
            quality_score,
        })
    }
}
