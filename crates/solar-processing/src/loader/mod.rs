//! Raw data loading.
//!
//! [`SolarDataLoader`] locates the raw export for a country inside its data
//! directory and parses it into a measurement table with a `Timestamp`
//! date-time column.

pub mod parsing;

use crate::config::{PipelineConfig, SolarSchema};
use crate::error::{Result, ResultExt, SolarError};
use crate::types::DatasetInfo;
use crate::utils::{self, match_key};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Loader for raw solar measurement files.
#[derive(Debug, Clone)]
pub struct SolarDataLoader {
    data_dir: PathBuf,
    schema: SolarSchema,
}

impl SolarDataLoader {
    /// Create a loader over `data_dir`, creating the directory if absent.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_schema(data_dir, SolarSchema::default())
    }

    pub fn with_schema(data_dir: impl Into<PathBuf>, schema: SolarSchema) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .context(format!("Creating data directory {}", data_dir.display()))?;
        Ok(Self { data_dir, schema })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::with_schema(&config.data_dir, config.schema.clone())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Locate the raw file for `country`.
    ///
    /// Matching ignores case and punctuation; files whose name contains
    /// `clean` are never raw inputs. Several matches resolve to the first
    /// in sorted order.
    pub fn find_raw_file(&self, country: &str) -> Result<PathBuf> {
        let key = match_key(country);
        let not_found = || SolarError::NotFound {
            country: country.to_string(),
            dir: self.data_dir.clone(),
        };
        if key.is_empty() {
            return Err(not_found());
        }

        let mut candidates: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(&self.data_dir).context("Listing data directory")? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.to_lowercase().contains("clean") {
                continue;
            }
            if match_key(name).contains(&key) {
                candidates.push(path);
            }
        }

        candidates.sort();
        if candidates.len() > 1 {
            debug!(country, matches = candidates.len(), "Several raw files match");
        }
        candidates.into_iter().next().ok_or_else(not_found)
    }

    /// Parse one raw file into a measurement table.
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let bytes = fs::read(path).context(format!("Reading {}", path.display()))?;
        let df = parsing::parse_table(&bytes, path, &self.schema.timestamp_column)?;
        info!(
            rows = df.height(),
            columns = df.width(),
            file = %path.display(),
            "Loaded raw data"
        );
        Ok(df)
    }

    /// Locate and parse the raw file for `country`.
    pub fn load_country(&self, country: &str) -> Result<DataFrame> {
        let path = self.find_raw_file(country)?;
        self.load_csv(&path)
    }

    /// Required schema columns absent from `df`, in schema order.
    pub fn validate_columns(&self, df: &DataFrame) -> Vec<String> {
        let missing: Vec<String> = self
            .schema
            .required_columns()
            .into_iter()
            .filter(|c| !utils::has_column(df, c))
            .collect();
        if !missing.is_empty() {
            warn!(missing = ?missing, "Missing expected columns");
        }
        missing
    }

    /// Structural facts about a loaded table.
    pub fn data_info(&self, df: &DataFrame) -> Result<DatasetInfo> {
        let ts = &self.schema.timestamp_column;
        let has_time_axis =
            utils::has_column(df, ts) && utils::is_datetime_dtype(df.column(ts)?.dtype());
        let date_range = if has_time_axis {
            let millis: Vec<i64> = utils::column_millis(df, ts)?.into_iter().flatten().collect();
            match (millis.iter().min(), millis.iter().max()) {
                (Some(first), Some(last)) => {
                    utils::format_millis(*first).zip(utils::format_millis(*last))
                }
                _ => None,
            }
        } else {
            None
        };

        let categorical_columns = df
            .get_columns()
            .iter()
            .filter(|c| utils::is_categorical_dtype(c.dtype()))
            .map(|c| c.name().to_string())
            .collect();

        Ok(DatasetInfo {
            rows: df.height(),
            columns: df.width(),
            estimated_size_mb: df.estimated_size() as f64 / (1024.0 * 1024.0),
            date_range,
            numeric_columns: utils::numeric_column_names(df),
            categorical_columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_new_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("data");
        let loader = SolarDataLoader::new(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(loader.data_dir(), dir.as_path());
    }

    #[test]
    fn test_find_raw_file_ignores_case_punctuation_and_clean() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "sierraleone-bumbuna.csv", "Timestamp\n");
        write(tmp.path(), "sierra_leone_clean.csv", "Timestamp\n");

        let loader = SolarDataLoader::new(tmp.path()).unwrap();
        let path = loader.find_raw_file("Sierra Leone").unwrap();
        assert_eq!(path.file_name().unwrap(), "sierraleone-bumbuna.csv");
    }

    #[test]
    fn test_find_raw_file_picks_first_sorted() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "togo-dapaong_qc.csv", "Timestamp\n");
        write(tmp.path(), "togo-a.csv", "Timestamp\n");

        let loader = SolarDataLoader::new(tmp.path()).unwrap();
        let path = loader.find_raw_file("togo").unwrap();
        assert_eq!(path.file_name().unwrap(), "togo-a.csv");
    }

    #[test]
    fn test_find_raw_file_not_found() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "benin_clean.csv", "Timestamp\n");
        let loader = SolarDataLoader::new(tmp.path()).unwrap();

        let err = loader.find_raw_file("benin").unwrap_err();
        assert!(err.is_not_found());
        assert!(loader.find_raw_file("  ").unwrap_err().is_not_found());
    }

    #[test]
    fn test_validate_columns_reports_missing() {
        let tmp = TempDir::new().unwrap();
        let loader = SolarDataLoader::new(tmp.path()).unwrap();
        let df = df!["Timestamp" => ["x"], "GHI" => [1.0]].unwrap();

        let missing = loader.validate_columns(&df);
        assert_eq!(missing.len(), 16);
        assert_eq!(missing[0], "DNI");
    }

    #[test]
    fn test_data_info() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "benin-malanville.csv",
            "Timestamp,GHI,Comments\n2021-08-09 00:01,1,a\n2021-08-10 12:00,2,b\n",
        );
        let loader = SolarDataLoader::new(tmp.path()).unwrap();
        let df = loader.load_country("Benin").unwrap();
        let info = loader.data_info(&df).unwrap();

        assert_eq!(info.rows, 2);
        assert_eq!(info.columns, 3);
        assert_eq!(
            info.date_range,
            Some((
                "2021-08-09 00:01:00".to_string(),
                "2021-08-10 12:00:00".to_string()
            ))
        );
        assert_eq!(info.numeric_columns, vec!["GHI"]);
        assert_eq!(info.categorical_columns, vec!["Comments"]);
    }

    #[test]
    fn test_data_info_without_parsed_time_axis() {
        let tmp = TempDir::new().unwrap();
        let loader = SolarDataLoader::new(tmp.path()).unwrap();
        let df = df!["Timestamp" => ["2021-08-09 00:01"], "GHI" => [1.0]].unwrap();
        let info = loader.data_info(&df).unwrap();
        assert_eq!(info.date_range, None);
        assert_eq!(info.categorical_columns, vec!["Timestamp"]);
    }
}
