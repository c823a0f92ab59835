//! Cross-country comparison over cleaned datasets.
//!
//! [`CleanDataStore`] discovers and loads `<slug>_clean.csv` files and tags
//! each row with its country. [`summary_table`] and [`rank_by_mean`] group
//! the combined table by country.

use crate::config::{PipelineConfig, SolarSchema};
use crate::error::{Result, ResultExt, SolarError};
use crate::loader::parsing::{find_timestamp_column, standardize_timestamp};
use crate::profiler::statistics;
use crate::utils::{self, slugify};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// Result types
// ============================================================================

/// Mean, median and sample standard deviation of one metric, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric: String,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
}

/// Per-country row of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySummary {
    pub country: String,
    pub metrics: Vec<MetricSummary>,
}

/// Mean of the ranking metric for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryMean {
    pub country: String,
    pub mean: Option<f64>,
}

// ============================================================================
// Cleaned-data discovery
// ============================================================================

/// Access to cleaned per-country files in one directory.
#[derive(Debug, Clone)]
pub struct CleanDataStore {
    dir: PathBuf,
    schema: SolarSchema,
}

impl CleanDataStore {
    pub fn new(dir: impl Into<PathBuf>, schema: SolarSchema) -> Self {
        Self {
            dir: dir.into(),
            schema,
        }
    }

    /// Store over the configured output directory.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.output_dir, config.schema.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cleaned file for `country`: `<slug>_clean.csv` when present, otherwise
    /// the first (sorted) CSV whose name contains both the slug and `clean`.
    pub fn find_clean_file(&self, country: &str) -> Result<Option<PathBuf>> {
        let slug = slugify(country);
        let exact = self.dir.join(format!("{slug}_clean.csv"));
        if exact.is_file() {
            return Ok(Some(exact));
        }
        if !self.dir.is_dir() {
            return Ok(None);
        }

        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.dir).context("Listing cleaned data directory")? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let name = name.to_lowercase();
            if name.ends_with(".csv") && name.contains(&slug) && name.contains("clean") {
                candidates.push(path);
            }
        }
        candidates.sort();
        Ok(candidates.into_iter().next())
    }

    /// Load the cleaned table for `country` and attach the country column.
    pub fn load_clean_country(&self, country: &str) -> Result<DataFrame> {
        let path = self
            .find_clean_file(country)?
            .ok_or_else(|| SolarError::NotFound {
                country: country.to_string(),
                dir: self.dir.clone(),
            })?;

        let mut df = CsvReadOptions::default()
            .with_infer_schema_length(None)
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.clone()))
            .context(format!("Opening {}", path.display()))?
            .finish()
            .context(format!("Parsing {}", path.display()))?;

        if let Some(source) = find_timestamp_column(&df) {
            df = standardize_timestamp(df, &source, &self.schema.timestamp_column)?;
        }

        let labels = vec![country; df.height()];
        df.with_column(Series::new(
            self.schema.country_column.as_str().into(),
            labels,
        ))?;

        debug!(country, rows = df.height(), "Loaded cleaned data");
        Ok(df)
    }

    /// Load several countries into one table.
    ///
    /// Countries whose file is missing or unreadable are skipped with a
    /// warning, and the call fails when none load. Other errors, such as a
    /// directory that cannot be listed, are returned immediately.
    pub fn load_countries<S: AsRef<str>>(&self, countries: &[S]) -> Result<DataFrame> {
        let mut frames = Vec::new();
        for country in countries {
            let country = country.as_ref();
            match self.load_clean_country(country) {
                Ok(df) => frames.push(df),
                Err(e) if e.is_recoverable() => warn!(country, error = %e, "Skipping country"),
                Err(e) => return Err(e),
            }
        }

        if frames.is_empty() {
            return Err(SolarError::NoCountriesLoaded(
                countries.iter().map(|c| c.as_ref().to_string()).collect(),
            ));
        }

        let combined = concat_aligned(frames)?;
        info!(rows = combined.height(), "Combined country data");
        Ok(combined)
    }

    /// Known countries that have a cleaned file.
    pub fn available_countries(&self) -> Result<Vec<String>> {
        let mut present = Vec::new();
        for country in &self.schema.known_countries {
            if self.find_clean_file(country)?.is_some() {
                present.push(country.clone());
            }
        }
        Ok(present)
    }
}

/// Stack tables whose columns may differ.
///
/// The result carries the union of columns in first-seen order and is null
/// where a table lacks a column. A column whose dtype differs between tables
/// becomes `Float64` when every dtype is numeric and `String` otherwise.
pub fn concat_aligned(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let mut schema: Vec<(PlSmallStr, DataType)> = Vec::new();
    for df in &frames {
        for col in df.get_columns() {
            match schema.iter_mut().find(|(name, _)| name == col.name()) {
                Some((_, dtype)) => *dtype = merge_dtypes(dtype, col.dtype()),
                None => schema.push((col.name().clone(), col.dtype().clone())),
            }
        }
    }

    let mut combined: Option<DataFrame> = None;
    for df in frames {
        let height = df.height();
        let mut columns = Vec::with_capacity(schema.len());
        for (name, dtype) in &schema {
            let series = match df.column(name.as_str()) {
                Ok(col) => col.as_materialized_series().cast(dtype)?,
                Err(_) => Series::full_null(name.clone(), height, dtype),
            };
            columns.push(Column::from(series));
        }
        let aligned = DataFrame::new(columns)?;

        match combined.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&aligned)?;
            }
            None => combined = Some(aligned),
        }
    }

    Ok(combined.unwrap_or_default())
}

/// Common dtype for one column seen with `current` and then `next`.
fn merge_dtypes(current: &DataType, next: &DataType) -> DataType {
    match (current, next) {
        (a, b) if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (a, b) if utils::is_numeric_dtype(a) && utils::is_numeric_dtype(b) => DataType::Float64,
        _ => DataType::String,
    }
}

// ============================================================================
// Grouped queries
// ============================================================================

/// Country labels plus the requested metrics as clean `Float64` columns.
fn metric_frame(df: &DataFrame, metrics: &[&str], country_column: &str) -> Result<DataFrame> {
    if !utils::has_column(df, country_column) {
        return Err(SolarError::ColumnNotFound(country_column.to_string()));
    }
    let labels = df
        .column(country_column)?
        .as_materialized_series()
        .cast(&DataType::String)?;

    let mut columns = vec![Column::from(labels)];
    for metric in metrics {
        let values = utils::column_f64(df, metric)?;
        columns.push(Column::from(Series::new((*metric).into(), values)));
    }
    Ok(DataFrame::new(columns)?)
}

fn group_labels(grouped: &DataFrame, country_column: &str) -> Result<Vec<String>> {
    Ok(grouped
        .column(country_column)?
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|label| label.unwrap_or_default().to_string())
        .collect())
}

/// Per-country mean, median and std of each present metric, sorted by country.
///
/// Metrics absent from the table are ignored; when none are present the
/// result is empty.
pub fn summary_table<S: AsRef<str>>(
    df_all: &DataFrame,
    metrics: &[S],
    country_column: &str,
) -> Result<Vec<CountrySummary>> {
    let present: Vec<&str> = metrics
        .iter()
        .map(|m| m.as_ref())
        .filter(|m| utils::has_column(df_all, m))
        .collect();
    if present.is_empty() {
        return Ok(Vec::new());
    }

    let frame = metric_frame(df_all, &present, country_column)?;
    let aggs: Vec<Expr> = present
        .iter()
        .flat_map(|m| {
            [
                col(*m).mean().alias(format!("{m}_mean")),
                col(*m).median().alias(format!("{m}_median")),
                col(*m).std(1).alias(format!("{m}_std")),
            ]
        })
        .collect();
    let grouped = utils::group_aggregate(&frame, country_column, aggs)?;

    let rounded = |name: String| -> Result<Vec<Option<f64>>> {
        Ok(utils::column_f64(&grouped, &name)?
            .into_iter()
            .map(|v| v.map(statistics::round2))
            .collect())
    };
    let mut per_metric = Vec::with_capacity(present.len());
    for metric in &present {
        per_metric.push((
            rounded(format!("{metric}_mean"))?,
            rounded(format!("{metric}_median"))?,
            rounded(format!("{metric}_std"))?,
        ));
    }

    Ok(group_labels(&grouped, country_column)?
        .into_iter()
        .enumerate()
        .map(|(row, country)| CountrySummary {
            country,
            metrics: present
                .iter()
                .zip(&per_metric)
                .map(|(metric, (mean, median, std))| MetricSummary {
                    metric: metric.to_string(),
                    mean: mean[row],
                    median: median[row],
                    std: std[row],
                })
                .collect(),
        })
        .collect())
}

/// Flatten a summary into a table: `Country`, then `<metric>_mean`,
/// `<metric>_median` and `<metric>_std` per metric.
pub fn summary_frame(summary: &[CountrySummary], country_column: &str) -> Result<DataFrame> {
    let mut columns = vec![Column::from(Series::new(
        country_column.into(),
        summary.iter().map(|s| s.country.as_str()).collect::<Vec<_>>(),
    ))];

    let Some(first) = summary.first() else {
        return Ok(DataFrame::new(columns)?);
    };

    for (i, metric) in first.metrics.iter().enumerate() {
        let pick = |f: fn(&MetricSummary) -> Option<f64>| -> Vec<Option<f64>> {
            summary.iter().map(|s| f(&s.metrics[i])).collect()
        };
        columns.push(Column::from(Series::new(
            format!("{}_mean", metric.metric).into(),
            pick(|m| m.mean),
        )));
        columns.push(Column::from(Series::new(
            format!("{}_median", metric.metric).into(),
            pick(|m| m.median),
        )));
        columns.push(Column::from(Series::new(
            format!("{}_std", metric.metric).into(),
            pick(|m| m.std),
        )));
    }

    Ok(DataFrame::new(columns)?)
}

/// Countries ordered by the mean of `metric`, highest first.
///
/// # Errors
/// [`SolarError::ColumnNotFound`] when `metric` is not a column.
pub fn rank_by_mean(df_all: &DataFrame, metric: &str, country_column: &str) -> Result<Vec<CountryMean>> {
    if !utils::has_column(df_all, metric) {
        return Err(SolarError::ColumnNotFound(metric.to_string()));
    }
    let frame = metric_frame(df_all, &[metric], country_column)?;
    let grouped = utils::group_aggregate(&frame, country_column, vec![col(metric).mean()])?;
    let means = utils::column_f64(&grouped, metric)?;

    let mut ranking: Vec<CountryMean> = group_labels(&grouped, country_column)?
        .into_iter()
        .zip(means)
        .map(|(country, mean)| CountryMean { country, mean })
        .collect();

    ranking.sort_by(|a, b| match (a.mean, b.mean) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    Ok(ranking)
}
