//! Shared utilities for loading, profiling and cleaning.
//!
//! This module contains helpers used across modules: dtype checks, lenient
//! cell parsing, value extraction, duplicate detection, grouped aggregation
//! and file-name normalization.

use crate::error::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Check if a DataType holds labels (strings or categoricals).
#[inline]
pub fn is_categorical_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

/// Names of all numeric columns, in table order.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_dtype(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

/// Check whether the table has a column with this exact name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

// =============================================================================
// Cell Parsing Utilities
// =============================================================================

/// Common error/missing value markers in sensor exports.
pub const ERROR_MARKERS: [&str; 9] = [
    "error", "unknown", "n/a", "na", "nan", "null", "missing", "none", "#n/a",
];

/// Check if a string is an error/missing value marker.
pub fn is_error_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|&marker| lower == marker)
}

/// Parse a raw cell as a finite number.
///
/// Empty cells, error markers and anything that is not a plain number
/// become `None`.
pub fn parse_numeric_cell(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() || is_error_marker(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

const DATETIME_FORMATS: [&str; 10] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a raw cell as a date-time. Unparsable input yields `None`.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Format epoch milliseconds the way reports print timestamps.
pub fn format_millis(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string())
}

// =============================================================================
// Series Extraction Utilities
// =============================================================================

/// Values of a column as `f64`, with nulls and NaN both reported as `None`.
///
/// Non-numeric columns are cast leniently, so unconvertible cells are `None`.
pub fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.as_materialized_series();
    series_f64(series)
}

/// Values of a series as `f64`, with nulls and NaN both reported as `None`.
pub fn series_f64(series: &Series) -> Result<Vec<Option<f64>>> {
    let float_series = series.cast(&DataType::Float64)?;
    Ok(float_series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Non-missing values of a column, in row order.
pub fn non_null_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    Ok(column_f64(df, name)?.into_iter().flatten().collect())
}

/// Epoch-millisecond values of a datetime column.
pub fn column_millis(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let series = df.column(name)?.as_materialized_series();
    let as_datetime = series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    let physical = as_datetime.cast(&DataType::Int64)?;
    Ok(physical.i64()?.into_iter().collect())
}

/// Per-row missing flags of a series. Float NaN counts as missing.
pub fn missing_mask(series: &Series) -> Result<Vec<bool>> {
    if matches!(series.dtype(), DataType::Float32 | DataType::Float64) {
        return Ok(series_f64(series)?.iter().map(Option::is_none).collect());
    }
    Ok(series.is_null().into_iter().map(|v| v.unwrap_or(true)).collect())
}

/// Number of missing cells in a series. Float NaN counts as missing.
pub fn missing_count(series: &Series) -> Result<usize> {
    Ok(missing_mask(series)?.into_iter().filter(|m| *m).count())
}

/// Replace NaN with null in a float series; other series are returned unchanged.
pub fn nan_to_null(series: &Series) -> Result<Series> {
    if !matches!(series.dtype(), DataType::Float32 | DataType::Float64) {
        return Ok(series.clone());
    }
    let values = series_f64(series)?;
    Ok(Series::new(series.name().clone(), values))
}

/// Fill null values in a numeric Series with a specific value.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> Result<Series> {
    let filled: Vec<Option<f64>> = series_f64(series)?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Row Utilities
// =============================================================================

/// The table with every exact repeat of an earlier row removed, order kept.
///
/// Null cells compare equal to each other and to nothing else.
pub fn unique_rows(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.unique_stable(None, UniqueKeepStrategy::First, None)?)
}

/// Number of rows that repeat an earlier row exactly.
pub fn duplicate_row_count(df: &DataFrame) -> Result<usize> {
    Ok(df.height() - unique_rows(df)?.height())
}

/// Group by `key`, evaluate `aggs` per group and order the groups by key.
///
/// Rows whose key is null belong to no group.
pub fn group_aggregate(df: &DataFrame, key: &str, aggs: Vec<Expr>) -> Result<DataFrame> {
    let grouped = df
        .clone()
        .lazy()
        .filter(col(key).is_not_null())
        .group_by([col(key)])
        .agg(aggs)
        .collect()?;
    Ok(grouped.sort([key], SortMultipleOptions::new())?)
}

/// Keep only the rows whose mask entry is `true`, preserving order.
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), keep);
    Ok(df.filter(&mask)?)
}

// =============================================================================
// Name Utilities
// =============================================================================

static NON_ALNUM_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid regex: non-alphanumeric run"));

/// Normalize a country name to a filename-friendly slug.
///
/// `"Sierra Leone"` and `"sierra-leone"` both become `"sierra_leone"`.
pub fn slugify(name: &str) -> String {
    NON_ALNUM_RUN
        .replace_all(&name.trim().to_lowercase(), "_")
        .into_owned()
}

/// Lower-case alphanumeric form used for case/punctuation-insensitive matching.
pub fn match_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
