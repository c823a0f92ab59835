//! Data cleaning module for solar measurement tables.
//!
//! This module provides:
//! - Exact duplicate removal
//! - Numeric coercion of the expected measurement columns
//! - Missing-value handling (median, mean, forward fill or row drop)
//! - Irradiance non-negativity validation
//! - Z-score outlier removal and IQR capping
//!
//! Steps live in [`steps`] as functions from a table to a [`StepOutcome`].
//! [`DataCleaner`] threads one working table through them and keeps the
//! append-only cleaning log.

pub mod steps;

pub use steps::StepOutcome;

use crate::config::{MissingValueStrategy, PipelineConfig};
use crate::error::Result;
use crate::types::{CleaningLogEntry, CleaningStage};
use polars::prelude::*;
use tracing::{debug, info};

/// Stateful cleaner over a private copy of a measurement table.
///
/// # Example
///
/// ```rust,ignore
/// let mut cleaner = DataCleaner::new(&raw);
/// let cleaned = cleaner.clean_pipeline(true)?;
/// let log = cleaner.report_frame()?;
/// ```
pub struct DataCleaner {
    df: DataFrame,
    config: PipelineConfig,
    log: Vec<CleaningLogEntry>,
    stage: CleaningStage,
}

static_assertions::assert_impl_all!(DataCleaner: Send);

impl DataCleaner {
    /// Clean a copy of `df` with the default configuration.
    pub fn new(df: &DataFrame) -> Self {
        Self::with_config(df, PipelineConfig::default())
    }

    /// Clean a copy of `df` with a custom configuration.
    pub fn with_config(df: &DataFrame, config: PipelineConfig) -> Self {
        Self {
            df: df.clone(),
            config,
            log: Vec::new(),
            stage: CleaningStage::Created,
        }
    }

    /// The current working table.
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_dataframe(self) -> DataFrame {
        self.df
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The last stage applied to the working table.
    pub fn stage(&self) -> CleaningStage {
        self.stage
    }

    /// Log entries recorded so far, oldest first.
    pub fn report(&self) -> &[CleaningLogEntry] {
        &self.log
    }

    /// The cleaning log as a table with `action` and `details` columns.
    pub fn report_frame(&self) -> Result<DataFrame> {
        log_to_frame(&self.log)
    }

    fn apply(&mut self, outcome: StepOutcome, stage: CleaningStage) -> &DataFrame {
        for entry in &outcome.entries {
            info!(action = %entry.action, "{}", entry.details);
        }
        self.log.extend(outcome.entries);
        self.df = outcome.df;
        self.stage = stage;
        debug!(stage = stage.display_name(), rows = self.df.height(), "Cleaning step applied");
        &self.df
    }

    // ========================================================================
    // Individual steps
    // ========================================================================

    pub fn remove_duplicates(&mut self) -> Result<&DataFrame> {
        let outcome = steps::remove_duplicates(self.df.clone())?;
        Ok(self.apply(outcome, CleaningStage::DuplicatesRemoved))
    }

    /// Coerce the schema's expected-numeric columns that are present.
    pub fn coerce_numeric_columns(&mut self) -> Result<&DataFrame> {
        let outcome = steps::coerce_numeric(self.df.clone(), &self.config.schema.numeric_columns)?;
        Ok(self.apply(outcome, CleaningStage::NumericCoerced))
    }

    /// Drop sparse columns, then apply `strategy` with the given column threshold.
    pub fn handle_missing_values(
        &mut self,
        strategy: MissingValueStrategy,
        threshold: f64,
    ) -> Result<&DataFrame> {
        let outcome = steps::handle_missing_values(self.df.clone(), strategy, threshold)?;
        Ok(self.apply(outcome, CleaningStage::MissingHandled))
    }

    pub fn validate_irradiance_values(&mut self) -> Result<&DataFrame> {
        let outcome =
            steps::clip_negative_irradiance(self.df.clone(), &self.config.schema.irradiance_columns)?;
        Ok(self.apply(outcome, CleaningStage::IrradianceValidated))
    }

    pub fn remove_outliers_zscore(
        &mut self,
        columns: &[String],
        threshold: f64,
    ) -> Result<&DataFrame> {
        let outcome = steps::remove_outliers_zscore(self.df.clone(), columns, threshold)?;
        Ok(self.apply(outcome, CleaningStage::OutliersRemoved))
    }

    /// Clip values outside each column's Tukey fences instead of removing rows.
    pub fn cap_outliers_iqr(&mut self, columns: &[String]) -> Result<&DataFrame> {
        let outcome = steps::cap_outliers_iqr(self.df.clone(), columns)?;
        Ok(self.apply(outcome, CleaningStage::OutliersCapped))
    }

    // ========================================================================
    // Canonical pipeline
    // ========================================================================

    /// Run the canonical pipeline and return the cleaned table.
    ///
    /// Order: duplicates, numeric coercion, missing values (configured
    /// strategy and threshold), irradiance validation, then Z-score outlier
    /// removal when `remove_outliers` is set.
    pub fn clean_pipeline(&mut self, remove_outliers: bool) -> Result<DataFrame> {
        info!(
            rows = self.df.height(),
            columns = self.df.width(),
            "Starting cleaning pipeline"
        );

        self.remove_duplicates()?;
        self.coerce_numeric_columns()?;
        self.handle_missing_values(
            self.config.missing_strategy,
            self.config.missing_column_threshold,
        )?;
        self.validate_irradiance_values()?;

        if remove_outliers {
            let columns = self.config.schema.outlier_columns.clone();
            self.remove_outliers_zscore(&columns, self.config.zscore_threshold)?;
        }

        self.stage = CleaningStage::Finalized;
        let (rows, columns) = self.df.shape();
        info!(rows, columns, "Cleaning complete");

        Ok(self.df.clone())
    }
}

/// Convert log entries into a two-column `action, details` table.
pub fn log_to_frame(entries: &[CleaningLogEntry]) -> Result<DataFrame> {
    Ok(df![
        "action" => entries.iter().map(|e| e.action.as_str()).collect::<Vec<_>>(),
        "details" => entries.iter().map(|e| e.details.as_str()).collect::<Vec<_>>(),
    ]?)
}
