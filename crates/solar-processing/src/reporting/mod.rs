//! Report generation module.
//!
//! Persists cleaned tables, cleaning logs and profile reports.
//!
//! # Outputs
//!
//! For a country slug such as `sierra_leone`:
//! - `<output_dir>/sierra_leone_clean.csv`
//! - `<reports_dir>/sierra_leone_cleaning_log.csv`
//! - `<reports_dir>/sierra_leone_profile_report.txt` and `.json`
//! - `<reports_dir>/sierra_leone_summary_stats.csv`
//! - `<reports_dir>/sierra_leone_missing_values.csv` (only when values are missing)
//!
//! # Example
//!
//! ```rust,ignore
//! use solar_processing::{DataCleaner, ReportGenerator};
//!
//! let mut cleaner = DataCleaner::new(&raw_df);
//! let cleaned = cleaner.clean_pipeline(true)?;
//!
//! let generator = ReportGenerator::new("data", "reports");
//! generator.save_clean_data(&cleaned, "Benin")?;
//! generator.save_cleaning_log(cleaner.report(), "Benin")?;
//! ```

mod generator;

pub use generator::{
    CSV_DATETIME_FORMAT, ProfileArtifacts, ProfileDocument, ReportGenerator,
    render_cleaning_summary, render_profile_text,
};
