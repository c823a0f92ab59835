//! Custom error types for the solar processing library.
//!
//! This module provides the error hierarchy using `thiserror`. Malformed
//! cell values never surface here: they are coerced to nulls by the loader
//! and the cleaner. Errors are reserved for missing inputs, caller contract
//! violations and I/O failures.
//!
//! Errors are serializable so a frontend or the `--json` CLI mode can
//! display them as `{code, message}` records.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for loading, profiling and cleaning.
#[derive(Error, Debug)]
pub enum SolarError {
    /// No raw data file matched the requested country.
    #[error("No data file found for '{country}' in {}", .dir.display())]
    NotFound { country: String, dir: PathBuf },

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// None of the parsing strategies produced a table with a timestamp column.
    #[error("Could not parse '{}': no strategy yielded a timestamp column", .path.display())]
    UnparsableFile { path: PathBuf },

    /// The table has zero rows; ratio-based scores are undefined.
    #[error("Table is empty: {0} is undefined for zero rows")]
    EmptyTable(&'static str),

    /// Missing-value strategy name outside the supported set.
    #[error("Unsupported missing-value strategy '{0}' (expected median, mean, forward_fill or drop)")]
    UnsupportedStrategy(String),

    /// Every country in a multi-country request failed to load.
    #[error("No data loaded for any of the requested countries: {}", .0.join(", "))]
    NoCountriesLoaded(Vec<String>),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SolarError>,
    },
}

impl SolarError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SolarError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::UnparsableFile { .. } => "UNPARSABLE_FILE",
            Self::EmptyTable(_) => "EMPTY_TABLE",
            Self::UnsupportedStrategy(_) => "UNSUPPORTED_STRATEGY",
            Self::NoCountriesLoaded(_) => "NO_COUNTRIES_LOADED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is a not-found condition (as opposed to "no data").
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if a multi-country operation may skip this failure and continue.
    ///
    /// Failures tied to one input file are recoverable. Plain I/O errors are
    /// not, since they come from the shared directory rather than one file.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::UnparsableFile { .. } | Self::Polars(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Serialize implementation emitting `code` and `message` fields.
impl Serialize for SolarError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("SolarError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for solar processing operations.
pub type Result<T> = std::result::Result<T, SolarError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| SolarError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| SolarError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = SolarError::NotFound {
            country: "togo".to_string(),
            dir: PathBuf::from("data"),
        };
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(
            SolarError::UnsupportedStrategy("interpolate".to_string()).error_code(),
            "UNSUPPORTED_STRATEGY"
        );
    }

    #[test]
    fn test_not_found_is_distinct_from_no_data() {
        let not_found = SolarError::NotFound {
            country: "benin".to_string(),
            dir: PathBuf::from("data"),
        };
        assert!(not_found.is_not_found());
        assert!(!SolarError::NoCountriesLoaded(vec!["benin".to_string()]).is_not_found());
        assert!(!SolarError::EmptyTable("completeness").is_not_found());
    }

    #[test]
    fn test_is_recoverable() {
        let err = SolarError::NotFound {
            country: "benin".to_string(),
            dir: PathBuf::from("data"),
        }
        .with_context("Loading benin");
        assert!(err.is_recoverable());
        let unreadable = SolarError::Polars(polars::error::PolarsError::NoData("empty".into()))
            .with_context("Parsing togo_clean.csv");
        assert!(unreadable.is_recoverable());
        let listing = SolarError::Io(std::io::Error::other("denied")).with_context("Listing");
        assert!(!listing.is_recoverable());
        assert!(!SolarError::InvalidConfig("bad".to_string()).is_recoverable());
    }

    #[test]
    fn test_error_serialization() {
        let error = SolarError::ColumnNotFound("GHI".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("GHI"));
    }

    #[test]
    fn test_with_context() {
        let error = SolarError::ColumnNotFound("GHI".to_string()).with_context("During profiling");
        assert!(error.to_string().contains("During profiling"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_no_countries_message_lists_requests() {
        let error = SolarError::NoCountriesLoaded(vec!["Benin".to_string(), "Togo".to_string()]);
        assert!(error.to_string().contains("Benin, Togo"));
    }
}
