//! Exploratory analysis over a cleaned measurement table.
//!
//! Correlations, cleaning-event impact on the module sensors, irradiance and
//! wind summaries, monthly/hourly profiles and short textual insights.

use crate::config::SolarSchema;
use crate::error::Result;
use crate::profiler::statistics;
use crate::utils::{self, format_millis};
use chrono::{DateTime, Datelike, Timelike};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Module sensor columns compared with and without cleaning events.
pub const MODULE_COLUMNS: [&str; 2] = ["ModA", "ModB"];

/// Absolute correlation at or above which a pair counts as strong.
pub const STRONG_CORRELATION: f64 = 0.7;

/// Percent change in module output reported as an insight.
const NOTABLE_CLEANING_CHANGE: f64 = 5.0;

const MILLIS_PER_DAY: i64 = 86_400_000;

const PERIOD_COLUMN: &str = "period";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major; `None` where a pair has no spread or fewer than two
    /// complete observations.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }

    /// Matrix as a table with a leading `column` label column.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns = vec![Column::from(Series::new(
            "column".into(),
            self.columns.iter().map(String::as_str).collect::<Vec<_>>(),
        ))];
        for (j, name) in self.columns.iter().enumerate() {
            let values: Vec<Option<f64>> = self.values.iter().map(|row| row[j]).collect();
            columns.push(Column::from(Series::new(name.as_str().into(), values)));
        }
        Ok(DataFrame::new(columns)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub first: String,
    pub second: String,
    pub coefficient: f64,
}

/// Mean module reading with and without a cleaning event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningImpact {
    pub module: String,
    pub avg_when_cleaned: Option<f64>,
    pub avg_when_not_cleaned: Option<f64>,
    pub difference: Option<f64>,
    /// Zero when the uncleaned mean is zero.
    pub percent_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrradianceSummary {
    pub column: String,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
    pub std: Option<f64>,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindSummary {
    pub mean_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub mean_direction: Option<f64>,
    pub direction_variability: Option<f64>,
    pub max_gust: Option<f64>,
    pub avg_gust: Option<f64>,
}

/// Means of several columns for one month (1-12) or hour (0-23).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMeans {
    pub period: u32,
    pub means: Vec<(String, Option<f64>)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: String,
    pub end: String,
    pub total_days: i64,
    pub total_records: usize,
}

/// Exploratory analyzer over a private copy of a table.
pub struct EdaAnalyzer {
    df: DataFrame,
    schema: SolarSchema,
}

static_assertions::assert_impl_all!(EdaAnalyzer: Send);

impl EdaAnalyzer {
    pub fn new(df: &DataFrame) -> Self {
        Self::with_schema(df, SolarSchema::default())
    }

    pub fn with_schema(df: &DataFrame, schema: SolarSchema) -> Self {
        Self {
            df: df.clone(),
            schema,
        }
    }

    fn has(&self, column: &str) -> bool {
        utils::has_column(&self.df, column)
    }

    fn values(&self, column: &str) -> Result<Vec<f64>> {
        utils::non_null_f64(&self.df, column)
    }

    // ========================================================================
    // Correlation
    // ========================================================================

    /// Pearson correlation over pairwise-complete rows.
    ///
    /// `columns` defaults to every numeric column; absent names are skipped.
    pub fn correlation_matrix(&self, columns: Option<&[String]>) -> Result<CorrelationMatrix> {
        let columns: Vec<String> = match columns {
            Some(cols) => cols.iter().filter(|c| self.has(c)).cloned().collect(),
            None => utils::numeric_column_names(&self.df),
        };
        let data = columns
            .iter()
            .map(|c| utils::column_f64(&self.df, c))
            .collect::<Result<Vec<_>>>()?;

        let values = (0..columns.len())
            .map(|i| {
                (0..columns.len())
                    .map(|j| {
                        if i == j {
                            data[i].iter().flatten().next().map(|_| 1.0)
                        } else {
                            statistics::pearson(&data[i], &data[j])
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(CorrelationMatrix { columns, values })
    }

    /// Pairs whose absolute correlation reaches `threshold`, strongest first.
    pub fn strong_correlations(
        &self,
        threshold: f64,
        columns: Option<&[String]>,
    ) -> Result<Vec<CorrelationPair>> {
        let matrix = self.correlation_matrix(columns)?;
        let mut pairs = Vec::new();
        for i in 0..matrix.columns.len() {
            for j in (i + 1)..matrix.columns.len() {
                if let Some(r) = matrix.values[i][j]
                    && r.abs() >= threshold
                {
                    pairs.push(CorrelationPair {
                        first: matrix.columns[i].clone(),
                        second: matrix.columns[j].clone(),
                        coefficient: r,
                    });
                }
            }
        }
        pairs.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));
        Ok(pairs)
    }

    // ========================================================================
    // Domain summaries
    // ========================================================================

    /// Module readings split by the cleaning flag. Empty without the flag column.
    pub fn cleaning_impact(&self) -> Result<Vec<CleaningImpact>> {
        let flag_column = &self.schema.cleaning_flag_column;
        if !self.has(flag_column) {
            return Ok(Vec::new());
        }
        let flags = utils::column_f64(&self.df, flag_column)?;

        let mut impacts = Vec::new();
        for module in MODULE_COLUMNS {
            if !self.has(module) {
                continue;
            }
            let readings = utils::column_f64(&self.df, module)?;
            let (mut cleaned, mut not_cleaned) = (Vec::new(), Vec::new());
            for (flag, reading) in flags.iter().zip(&readings) {
                match (flag, reading) {
                    (Some(f), Some(r)) if *f == 1.0 => cleaned.push(*r),
                    (Some(f), Some(r)) if *f == 0.0 => not_cleaned.push(*r),
                    _ => {}
                }
            }

            let with = statistics::mean(&cleaned);
            let without = statistics::mean(&not_cleaned);
            let difference = with.zip(without).map(|(w, wo)| w - wo);
            let percent_change = difference.zip(without).map(|(d, wo)| {
                if wo != 0.0 { d / wo * 100.0 } else { 0.0 }
            });

            impacts.push(CleaningImpact {
                module: module.to_string(),
                avg_when_cleaned: with,
                avg_when_not_cleaned: without,
                difference,
                percent_change,
            });
        }
        Ok(impacts)
    }

    /// Summaries of the comparison irradiance metrics present in the table.
    pub fn irradiance_summary(&self) -> Result<Vec<IrradianceSummary>> {
        let mut summaries = Vec::new();
        for column in &self.schema.comparison_metrics {
            if !self.has(column) {
                continue;
            }
            let values = self.values(column)?;
            let sorted = statistics::sorted(&values);
            summaries.push(IrradianceSummary {
                column: column.clone(),
                mean: statistics::mean(&values),
                median: statistics::quantile_sorted(&sorted, 0.5),
                max: sorted.last().copied(),
                std: statistics::sample_std(&values),
                total: values.iter().sum(),
            });
        }
        Ok(summaries)
    }

    pub fn wind_summary(&self) -> Result<WindSummary> {
        let mut summary = WindSummary::default();
        if self.has("WS") {
            let speed = self.values("WS")?;
            summary.mean_speed = statistics::mean(&speed);
            summary.max_speed = speed.iter().copied().reduce(f64::max);
        }
        if self.has("WD") {
            let direction = self.values("WD")?;
            summary.mean_direction = statistics::mean(&direction);
            summary.direction_variability = statistics::sample_std(&direction);
        }
        if self.has("WSgust") {
            let gust = self.values("WSgust")?;
            summary.max_gust = gust.iter().copied().reduce(f64::max);
            summary.avg_gust = statistics::mean(&gust);
        }
        Ok(summary)
    }

    // ========================================================================
    // Temporal profiles
    // ========================================================================

    fn timestamps(&self) -> Result<Option<Vec<Option<i64>>>> {
        let ts = &self.schema.timestamp_column;
        if !self.has(ts) {
            return Ok(None);
        }
        Ok(Some(utils::column_millis(&self.df, ts)?))
    }

    fn period_means(
        &self,
        value_columns: &[String],
        period_of: impl Fn(i64) -> Option<u32>,
    ) -> Result<Vec<PeriodMeans>> {
        let Some(timestamps) = self.timestamps()? else {
            return Ok(Vec::new());
        };
        let columns: Vec<&String> = value_columns.iter().filter(|c| self.has(c)).collect();

        let periods: Vec<Option<u32>> = timestamps
            .into_iter()
            .map(|ms| ms.and_then(&period_of))
            .collect();
        let mut frame = vec![Column::from(Series::new(PERIOD_COLUMN.into(), periods))];
        for name in &columns {
            let values = utils::column_f64(&self.df, name)?;
            frame.push(Column::from(Series::new(name.as_str().into(), values)));
        }
        let frame = DataFrame::new(frame)?;

        let aggs = columns.iter().map(|c| col(c.as_str()).mean()).collect();
        let grouped = utils::group_aggregate(&frame, PERIOD_COLUMN, aggs)?;
        let means = columns
            .iter()
            .map(|c| utils::column_f64(&grouped, c))
            .collect::<Result<Vec<_>>>()?;

        Ok(grouped
            .column(PERIOD_COLUMN)?
            .as_materialized_series()
            .u32()?
            .into_iter()
            .enumerate()
            .map(|(row, period)| PeriodMeans {
                period: period.unwrap_or_default(),
                means: columns
                    .iter()
                    .zip(&means)
                    .map(|(name, values)| (name.to_string(), values[row]))
                    .collect(),
            })
            .collect())
    }

    /// Mean of each column per calendar month (1-12).
    pub fn monthly_means(&self, value_columns: &[String]) -> Result<Vec<PeriodMeans>> {
        self.period_means(value_columns, |ms| {
            DateTime::from_timestamp_millis(ms).map(|dt| dt.month())
        })
    }

    /// Mean of each column per hour of day (0-23).
    pub fn hourly_means(&self, value_columns: &[String]) -> Result<Vec<PeriodMeans>> {
        self.period_means(value_columns, |ms| {
            DateTime::from_timestamp_millis(ms).map(|dt| dt.hour())
        })
    }

    /// First and last timestamp with the whole days between them.
    pub fn time_span(&self) -> Result<Option<TimeSpan>> {
        let Some(timestamps) = self.timestamps()? else {
            return Ok(None);
        };
        let present: Vec<i64> = timestamps.into_iter().flatten().collect();
        let (Some(&first), Some(&last)) = (present.iter().min(), present.iter().max()) else {
            return Ok(None);
        };

        Ok(format_millis(first)
            .zip(format_millis(last))
            .map(|(start, end)| TimeSpan {
                start,
                end,
                total_days: (last - first) / MILLIS_PER_DAY,
                total_records: self.df.height(),
            }))
    }

    // ========================================================================
    // Insights
    // ========================================================================

    /// Short human-readable findings.
    pub fn insights(&self) -> Result<Vec<String>> {
        let mut insights = Vec::new();

        let strong = self.strong_correlations(STRONG_CORRELATION, None)?;
        if !strong.is_empty() {
            insights.push(format!(
                "Strong correlations found between {} variable pairs",
                strong.len()
            ));
        }

        let ranking_metric = &self.schema.ranking_metric;
        if self.has(ranking_metric) {
            let values = self.values(ranking_metric)?;
            if let (Some(peak), Some(avg)) =
                (values.iter().copied().reduce(f64::max), statistics::mean(&values))
            {
                insights.push(format!(
                    "Peak {ranking_metric}: {peak:.2} W/m², Average: {avg:.2} W/m²"
                ));
            }
        }

        if self.has("Tamb") {
            let temps = statistics::sorted(&self.values("Tamb")?);
            if let (Some(min), Some(max), Some(avg)) =
                (temps.first(), temps.last(), statistics::mean(&temps))
            {
                insights.push(format!(
                    "Temperature range: {min:.1}°C to {max:.1}°C (avg: {avg:.1}°C)"
                ));
            }
        }

        for impact in self.cleaning_impact()? {
            if let Some(change) = impact.percent_change
                && change.abs() > NOTABLE_CLEANING_CHANGE
            {
                insights.push(format!(
                    "{} shows {change:.1}% performance change with cleaning",
                    impact.module
                ));
            }
        }

        Ok(insights)
    }
}
