//! Individual cleaning steps.
//!
//! Every step takes the current table and returns a [`StepOutcome`]: the new
//! table plus the log entries describing what changed. Steps that change
//! nothing return no entries.

use crate::config::MissingValueStrategy;
use crate::error::Result;
use crate::profiler::statistics;
use crate::types::CleaningLogEntry;
use crate::utils::{self, filter_rows, missing_count, missing_mask};
use polars::prelude::*;
use tracing::debug;

/// Result of one cleaning step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub df: DataFrame,
    pub entries: Vec<CleaningLogEntry>,
}

impl StepOutcome {
    fn unchanged(df: DataFrame) -> Self {
        Self {
            df,
            entries: Vec::new(),
        }
    }

    fn with_entries(df: DataFrame, entries: Vec<CleaningLogEntry>) -> Self {
        Self { df, entries }
    }
}

/// Remove rows identical to an earlier row across all columns, keeping the first.
pub fn remove_duplicates(df: DataFrame) -> Result<StepOutcome> {
    let before = df.height();
    let deduped = utils::unique_rows(&df)?;
    let removed = before - deduped.height();

    if removed == 0 {
        return Ok(StepOutcome::unchanged(df));
    }

    Ok(StepOutcome::with_entries(
        deduped,
        vec![CleaningLogEntry::new(
            "Removed duplicates",
            format!("{removed} duplicate rows removed"),
        )],
    ))
}

/// Coerce the named columns to `Float64`. Unparsable cells become null and
/// absent columns are skipped. Integer columns are widened without logging.
pub fn coerce_numeric(mut df: DataFrame, columns: &[String]) -> Result<StepOutcome> {
    let mut entries = Vec::new();

    for name in columns {
        if !utils::has_column(&df, name) {
            continue;
        }
        let series = df.column(name)?.as_materialized_series().clone();
        if series.dtype() == &DataType::Float64 {
            continue;
        }
        if utils::is_numeric_dtype(series.dtype()) {
            df.replace(name, series.cast(&DataType::Float64)?)?;
            continue;
        }

        let (coerced, lost) = if series.dtype() == &DataType::String {
            let mut lost = 0;
            let values: Vec<Option<f64>> = series
                .str()?
                .into_iter()
                .map(|cell| {
                    let parsed = cell.and_then(utils::parse_numeric_cell);
                    if parsed.is_none() && cell.is_some_and(|c| !c.trim().is_empty()) {
                        lost += 1;
                    }
                    parsed
                })
                .collect();
            (Series::new(name.as_str().into(), values), lost)
        } else {
            let before = series.null_count();
            let values = utils::series_f64(&series)?;
            let coerced = Series::new(name.as_str().into(), values);
            let lost = coerced.null_count().saturating_sub(before);
            (coerced, lost)
        };

        df.replace(name, coerced)?;
        debug!(column = %name, unparsable = lost, "Coerced column to numeric");

        if lost > 0 {
            entries.push(CleaningLogEntry::new(
                "Coerced numeric",
                format!("{name}: {lost} unparsable values set to missing"),
            ));
        }
    }

    Ok(StepOutcome::with_entries(df, entries))
}

/// Drop columns whose missing ratio exceeds `threshold`, then apply `strategy`.
pub fn handle_missing_values(
    df: DataFrame,
    strategy: MissingValueStrategy,
    threshold: f64,
) -> Result<StepOutcome> {
    let mut entries = Vec::new();
    let mut df = drop_sparse_columns(df, threshold, &mut entries)?;

    match strategy {
        MissingValueStrategy::Median | MissingValueStrategy::Mean => {
            fill_with_central_tendency(&mut df, strategy)?;
        }
        MissingValueStrategy::ForwardFill => {
            df = forward_fill(&df)?;
        }
        MissingValueStrategy::Drop => {
            let before = df.height();
            df = drop_incomplete_rows(&df)?;
            let removed = before - df.height();
            if removed > 0 {
                entries.push(CleaningLogEntry::new(
                    "Dropped rows",
                    format!("{removed} rows with missing values removed"),
                ));
            }
        }
    }

    Ok(StepOutcome::with_entries(df, entries))
}

fn drop_sparse_columns(
    df: DataFrame,
    threshold: f64,
    entries: &mut Vec<CleaningLogEntry>,
) -> Result<DataFrame> {
    let rows = df.height();
    if rows == 0 {
        return Ok(df);
    }

    let mut to_drop: Vec<PlSmallStr> = Vec::new();
    for col in df.get_columns() {
        let ratio = missing_count(col.as_materialized_series())? as f64 / rows as f64;
        if ratio > threshold {
            to_drop.push(col.name().clone());
        }
    }

    if to_drop.is_empty() {
        return Ok(df);
    }

    let dropped = to_drop.len();
    debug!(columns = ?to_drop, "Dropping sparse columns");
    entries.push(CleaningLogEntry::new(
        "Dropped columns",
        format!(
            "Removed {dropped} columns with >{:.1}% missing",
            threshold * 100.0
        ),
    ));
    Ok(df.drop_many(to_drop))
}

fn fill_with_central_tendency(df: &mut DataFrame, strategy: MissingValueStrategy) -> Result<()> {
    for name in utils::numeric_column_names(df) {
        let series = df.column(&name)?.as_materialized_series().clone();
        if missing_count(&series)? == 0 {
            continue;
        }

        let present: Vec<f64> = utils::series_f64(&series)?.into_iter().flatten().collect();
        let fill_value = match strategy {
            MissingValueStrategy::Mean => statistics::mean(&present),
            _ => statistics::quantile_sorted(&statistics::sorted(&present), 0.5),
        };

        if let Some(value) = fill_value {
            df.replace(&name, utils::fill_numeric_nulls(&series, value)?)?;
        }
    }
    Ok(())
}

fn forward_fill(df: &DataFrame) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(df.width());
    for col in df.get_columns() {
        let series = utils::nan_to_null(col.as_materialized_series())?;
        columns.push(Column::from(
            series.fill_null(FillNullStrategy::Forward(None))?,
        ));
    }
    Ok(DataFrame::new(columns)?)
}

fn drop_incomplete_rows(df: &DataFrame) -> Result<DataFrame> {
    let mut keep = vec![true; df.height()];
    for col in df.get_columns() {
        for (k, missing) in keep
            .iter_mut()
            .zip(missing_mask(col.as_materialized_series())?)
        {
            *k &= !missing;
        }
    }
    filter_rows(df, &keep)
}

/// Clip negative readings in the given irradiance columns to zero.
pub fn clip_negative_irradiance(mut df: DataFrame, columns: &[String]) -> Result<StepOutcome> {
    let mut entries = Vec::new();

    for name in columns {
        if !utils::has_column(&df, name) {
            continue;
        }
        let values = utils::column_f64(&df, name)?;
        let negative = values.iter().flatten().filter(|v| **v < 0.0).count();
        if negative == 0 {
            continue;
        }

        let clipped: Vec<Option<f64>> = values.into_iter().map(|v| v.map(|x| x.max(0.0))).collect();
        df.replace(name, Series::new(name.as_str().into(), clipped))?;
        entries.push(CleaningLogEntry::new(
            "Fixed negative values",
            format!("{name}: {negative} values set to 0"),
        ));
    }

    Ok(StepOutcome::with_entries(df, entries))
}

/// Remove rows whose absolute Z-score exceeds `threshold`.
///
/// Columns are processed in order against the current table, so the
/// statistics for each column only see rows that survived the previous
/// columns. Rows missing a value in a checked column are removed as well.
pub fn remove_outliers_zscore(
    mut df: DataFrame,
    columns: &[String],
    threshold: f64,
) -> Result<StepOutcome> {
    let before = df.height();

    for name in columns {
        if !utils::has_column(&df, name) {
            continue;
        }
        let scores = statistics::abs_zscores(&utils::column_f64(&df, name)?);
        let keep: Vec<bool> = scores
            .iter()
            .map(|z| z.is_some_and(|z| z <= threshold))
            .collect();
        df = filter_rows(&df, &keep)?;
        debug!(column = %name, remaining = df.height(), "Z-score pass complete");
    }

    let removed = before - df.height();
    if removed == 0 {
        return Ok(StepOutcome::unchanged(df));
    }

    Ok(StepOutcome::with_entries(
        df,
        vec![CleaningLogEntry::new(
            "Removed outliers",
            format!("{removed} outlier rows removed (Z-score > {threshold})"),
        )],
    ))
}

/// Clip values outside the Tukey fences of each column to the fence.
pub fn cap_outliers_iqr(mut df: DataFrame, columns: &[String]) -> Result<StepOutcome> {
    let mut entries = Vec::new();

    for name in columns {
        if !utils::has_column(&df, name) {
            continue;
        }
        let values = utils::column_f64(&df, name)?;
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let Some((lower, upper)) = statistics::iqr_bounds(&present) else {
            continue;
        };

        let capped = present.iter().filter(|v| **v < lower || **v > upper).count();
        if capped == 0 {
            continue;
        }

        let clipped: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| v.map(|x| x.clamp(lower, upper)))
            .collect();
        df.replace(name, Series::new(name.as_str().into(), clipped))?;
        entries.push(CleaningLogEntry::new(
            "Capped outliers",
            format!("{name}: {capped} values capped"),
        ));
    }

    Ok(StepOutcome::with_entries(df, entries))
}
