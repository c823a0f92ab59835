use crate::cleaner::log_to_frame;
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::types::{CleaningLogEntry, CleaningSummary, ColumnStatistics, ProfileReport};
use crate::utils::slugify;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const RULE_WIDTH: usize = 60;
const CELL_WIDTH: usize = 14;

/// Datetime layout used in every CSV this crate writes.
///
/// Fractional seconds are written only when present, so whole-second
/// timestamps stay in the plain `YYYY-MM-DD HH:MM:SS` form.
pub const CSV_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ============================================================================
// Report Types
// ============================================================================

/// JSON envelope around a profile report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDocument {
    /// Timestamp when the report was generated
    pub generated_at: String,
    pub country: String,
    /// First and last timestamp of the profiled table
    pub date_range: Option<(String, String)>,
    #[serde(flatten)]
    pub report: ProfileReport,
}

/// Paths written for one profiled country.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileArtifacts {
    pub text_report: PathBuf,
    pub summary_stats: PathBuf,
    /// Only written when the table has missing values
    pub missing_values: Option<PathBuf>,
    pub json_report: PathBuf,
}

// ============================================================================
// Report Generator
// ============================================================================

/// Writes cleaned tables, cleaning logs and profile reports.
///
/// Cleaned tables go to the output directory; logs and reports go to the
/// reports directory. Both are created on demand.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
    reports_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>, reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            reports_dir: reports_dir.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.output_dir, &config.reports_dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Path of the cleaned table for `country`.
    pub fn clean_data_path(&self, country: &str) -> PathBuf {
        self.output_dir.join(format!("{}_clean.csv", slugify(country)))
    }

    /// Write `df` as comma-separated CSV with a header row.
    pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context(format!("Creating {}", parent.display()))?;
        }
        let mut file = File::create(path).context(format!("Creating {}", path.display()))?;
        let mut df = df.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_datetime_format(Some(CSV_DATETIME_FORMAT.to_string()))
            .finish(&mut df)
            .context(format!("Writing {}", path.display()))?;
        debug!(path = %path.display(), rows = df.height(), "CSV written");
        Ok(())
    }

    /// Save the cleaned table as `<slug>_clean.csv`.
    pub fn save_clean_data(&self, df: &DataFrame, country: &str) -> Result<PathBuf> {
        let path = self.clean_data_path(country);
        Self::write_csv(df, &path)?;
        info!("Cleaned data saved: {}", path.display());
        Ok(path)
    }

    /// Save the cleaning log as `<slug>_cleaning_log.csv`.
    pub fn save_cleaning_log(&self, entries: &[CleaningLogEntry], country: &str) -> Result<PathBuf> {
        let path = self
            .reports_dir
            .join(format!("{}_cleaning_log.csv", slugify(country)));
        Self::write_csv(&log_to_frame(entries)?, &path)?;
        info!("Cleaning log saved: {}", path.display());
        Ok(path)
    }

    /// Write the text, CSV and JSON profile artifacts for `country`.
    pub fn write_profile_report(
        &self,
        country: &str,
        report: &ProfileReport,
        date_range: Option<(String, String)>,
        summary_frame: &DataFrame,
        missing_frame: &DataFrame,
    ) -> Result<ProfileArtifacts> {
        fs::create_dir_all(&self.reports_dir).context("Creating reports directory")?;
        let slug = slugify(country);

        let text_report = self.reports_dir.join(format!("{slug}_profile_report.txt"));
        let text = render_profile_text(country, report, date_range.as_ref());
        fs::write(&text_report, text).context(format!("Writing {}", text_report.display()))?;

        let summary_stats = self.reports_dir.join(format!("{slug}_summary_stats.csv"));
        Self::write_csv(summary_frame, &summary_stats)?;

        let missing_values = if report.missing_values.is_empty() {
            None
        } else {
            let path = self.reports_dir.join(format!("{slug}_missing_values.csv"));
            Self::write_csv(missing_frame, &path)?;
            Some(path)
        };

        let document = ProfileDocument {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            country: country.to_string(),
            date_range,
            report: report.clone(),
        };
        let json_report = self.write_json(&document, &format!("{slug}_profile_report.json"))?;

        info!("Profile report saved: {}", text_report.display());
        Ok(ProfileArtifacts {
            text_report,
            summary_stats,
            missing_values,
            json_report,
        })
    }

    /// Serialize `value` as pretty JSON into the reports directory.
    pub fn write_json<T: Serialize>(&self, value: &T, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.reports_dir).context("Creating reports directory")?;
        let path = self.reports_dir.join(file_name);
        let mut file = File::create(&path).context(format!("Creating {}", path.display()))?;
        file.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;
        Ok(path)
    }
}

// ============================================================================
// Text Rendering
// ============================================================================

fn title_case(metric: &str) -> String {
    metric
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:>CELL_WIDTH$.4}"),
        None => format!("{:>CELL_WIDTH$}", "NaN"),
    }
}

fn render_statistics(stats: &[ColumnStatistics]) -> String {
    if stats.is_empty() {
        return "No numeric columns\n".to_string();
    }

    let mut out = format!("{:<10}", "");
    for stat in stats {
        let _ = write!(out, "{:>CELL_WIDTH$}", stat.column);
    }
    out.push('\n');

    for (row, label) in ColumnStatistics::STATISTIC_NAMES.iter().enumerate() {
        let _ = write!(out, "{label:<10}");
        for stat in stats {
            out.push_str(&format_cell(stat.values()[row]));
        }
        out.push('\n');
    }
    out
}

/// Plain-text profile report.
pub fn render_profile_text(
    country: &str,
    report: &ProfileReport,
    date_range: Option<&(String, String)>,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "DATA PROFILING REPORT: {}", country.to_uppercase());
    let _ = writeln!(out, "{rule}\n");
    let _ = writeln!(out, "Dataset Shape: ({}, {})", report.shape.0, report.shape.1);
    match date_range {
        Some((start, end)) => {
            let _ = writeln!(out, "Date Range: {start} to {end}\n");
        }
        None => out.push_str("Date Range: unavailable\n\n"),
    }

    let _ = writeln!(out, "SUMMARY STATISTICS\n{thin}");
    out.push_str(&render_statistics(&report.summary_statistics));
    out.push_str("\n\n");

    let _ = writeln!(out, "MISSING VALUES\n{thin}");
    if report.missing_values.is_empty() {
        out.push_str("No missing values\n");
    } else {
        for entry in &report.missing_values {
            let _ = writeln!(
                out,
                "{:<16}{:>10}{:>10.2}%  {}",
                entry.column, entry.missing_count, entry.missing_percent, entry.dtype
            );
        }
    }
    out.push_str("\n\n");

    let _ = writeln!(out, "OUTLIERS (Z-SCORE > 3)\n{thin}");
    if report.outliers_zscore.is_empty() {
        out.push_str("No significant outliers detected\n");
    } else {
        for outlier in &report.outliers_zscore {
            let _ = writeln!(
                out,
                "{}: {} ({:.2}%)",
                outlier.column, outlier.count, outlier.percentage
            );
        }
    }
    out.push_str("\n\n");

    let _ = writeln!(out, "DATA QUALITY SCORES\n{thin}");
    match &report.quality_score {
        Some(score) => {
            for (metric, value) in score.metrics() {
                let _ = writeln!(out, "{}: {value:.2}%", title_case(metric));
            }
        }
        None => out.push_str("Not available for an empty table\n"),
    }

    out
}

/// Plain-text retention summary printed after a cleaning run.
pub fn render_cleaning_summary(summary: &CleaningSummary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!(
        "{rule}\nCLEANING SUMMARY: {}\n{rule}\nOriginal rows: {}\nCleaned rows: {}\nRows removed: {}\nRetention rate: {:.2}%\n{rule}",
        summary.country.to_uppercase(),
        summary.original_rows,
        summary.cleaned_rows,
        summary.rows_removed,
        summary.retention_percent
    )
}
